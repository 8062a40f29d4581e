//! `$2000-$2002` bit layouts and the loopy scroll latches.

mod control;
mod mask;
mod status;
mod vram_addr;

pub(crate) use control::Control;
pub(crate) use mask::Mask;
pub(crate) use status::Status;
pub(crate) use vram_addr::VramAddr;

/// `v`, `t`, fine X and the shared `$2005/$2006` write toggle.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VramRegisters {
    pub(crate) v: VramAddr,
    pub(crate) t: VramAddr,
    pub(crate) x: u8,
    /// Set after the first half of a `$2005/$2006` pair.
    pub(crate) w: bool,
}

impl VramRegisters {
    pub(crate) fn write_control(&mut self, control: Control) {
        self.t.set_nametable(control.nametable_index());
    }

    pub(crate) fn write_scroll(&mut self, value: u8) {
        let (coarse, fine) = (value >> 3, value & 0x07);
        if self.w {
            self.t.set_coarse_y(coarse);
            self.t.set_fine_y(fine);
        } else {
            self.t.set_coarse_x(coarse);
            self.x = fine;
        }
        self.w = !self.w;
    }

    /// Returns `true` on the second write, which also loads `v`. The first
    /// write clears bit 14 of `t`.
    pub(crate) fn write_addr(&mut self, value: u8) -> bool {
        let t = self.t.raw();
        let completed = self.w;
        if completed {
            self.t.set_raw((t & 0x7F00) | u16::from(value));
            self.v = self.t;
        } else {
            self.t.set_raw((t & 0x00FF) | (u16::from(value & 0x3F) << 8));
        }
        self.w = !completed;
        completed
    }

    pub(crate) fn reset_latch(&mut self) {
        self.w = false;
    }

    /// Dot 257: horizontal scroll bits return from `t`.
    pub(crate) fn copy_horizontal(&mut self) {
        self.v.set_coarse_x(self.t.coarse_x());
        self.v
            .set_nametable((self.v.nametable() & 0b10) | (self.t.nametable() & 0b01));
    }

    /// Pre-render dots 280-304: vertical scroll bits return from `t`.
    pub(crate) fn copy_vertical(&mut self) {
        self.v.set_coarse_y(self.t.coarse_y());
        self.v.set_fine_y(self.t.fine_y());
        self.v
            .set_nametable((self.v.nametable() & 0b01) | (self.t.nametable() & 0b10));
    }
}
