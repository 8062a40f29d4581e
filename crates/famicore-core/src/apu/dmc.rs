//! Delta modulation channel.
//!
//! Sample bytes arrive through DMA: the channel posts a fetch address, the
//! CPU steals the bus cycles and hands the byte back through
//! [`Dmc::finish_fetch`].

use super::tables::{DMC_RATE_TABLE, DMC_SAMPLE_ADDR_STRIDE, DMC_SAMPLE_BASE, DMC_SAMPLE_LEN_STRIDE};

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dmc {
    irq_enable: bool,
    loop_flag: bool,
    pub(super) irq_flag: bool,
    /// `$4015` bit-4 clear takes effect 2 or 3 CPU cycles later.
    disable_delay: u8,
    /// Same parity rule for the first fetch after enabling.
    transfer_start_delay: u8,
    output_level: u8,
    sample_address: u16,
    sample_length: u16,
    current_address: u16,
    bytes_remaining: u16,
    sample_buffer: Option<u8>,
    shift_register: u8,
    bits_remaining: u8,
    silence: bool,
    timer: u16,
    timer_period: u16,
    /// Address posted to the CPU and not yet serviced.
    pending_fetch: Option<u16>,
    /// The CPU has not picked up `pending_fetch` yet.
    request_unclaimed: bool,
}

impl Default for Dmc {
    fn default() -> Self {
        Self {
            irq_enable: false,
            loop_flag: false,
            irq_flag: false,
            disable_delay: 0,
            transfer_start_delay: 0,
            output_level: 0,
            sample_address: DMC_SAMPLE_BASE,
            sample_length: 1,
            current_address: DMC_SAMPLE_BASE,
            bytes_remaining: 0,
            sample_buffer: None,
            shift_register: 0,
            bits_remaining: 8,
            silence: true,
            timer: DMC_RATE_TABLE[0] - 1,
            timer_period: DMC_RATE_TABLE[0] - 1,
            pending_fetch: None,
            request_unclaimed: false,
        }
    }
}

impl Dmc {
    pub(super) fn write_control(&mut self, value: u8) {
        self.irq_enable = value & 0x80 != 0;
        if !self.irq_enable {
            self.irq_flag = false;
        }
        self.loop_flag = value & 0x40 != 0;
        self.timer_period = DMC_RATE_TABLE[usize::from(value & 0x0F)] - 1;
    }

    pub(super) fn write_direct_load(&mut self, value: u8) {
        self.output_level = value & 0x7F;
    }

    pub(super) fn write_sample_address(&mut self, value: u8) {
        self.sample_address = DMC_SAMPLE_BASE + u16::from(value) * DMC_SAMPLE_ADDR_STRIDE;
    }

    pub(super) fn write_sample_length(&mut self, value: u8) {
        self.sample_length = u16::from(value) * DMC_SAMPLE_LEN_STRIDE + 1;
    }

    pub(super) fn set_enabled(&mut self, enabled: bool, odd_cycle: bool) {
        let delay = if odd_cycle { 3 } else { 2 };
        if !enabled {
            if self.disable_delay == 0 {
                self.disable_delay = delay;
            }
        } else if self.bytes_remaining == 0 {
            self.restart_sample();
            self.transfer_start_delay = delay;
        }
    }

    pub(super) fn active(&self) -> bool {
        self.bytes_remaining > 0
    }

    /// One CPU cycle: delays, output timer, and fetch scheduling.
    pub(super) fn clock(&mut self) {
        if self.disable_delay > 0 {
            self.disable_delay -= 1;
            if self.disable_delay == 0 {
                self.bytes_remaining = 0;
                self.transfer_start_delay = 0;
                // A request the CPU has not started is withdrawn.
                if self.request_unclaimed {
                    self.pending_fetch = None;
                    self.request_unclaimed = false;
                }
            }
        }
        if self.transfer_start_delay > 0 {
            self.transfer_start_delay -= 1;
        }

        if self.timer == 0 {
            self.timer = self.timer_period;
            self.shift_output();
        } else {
            self.timer -= 1;
        }

        if self.transfer_start_delay == 0
            && self.sample_buffer.is_none()
            && self.bytes_remaining > 0
            && self.pending_fetch.is_none()
        {
            self.pending_fetch = Some(self.current_address);
            self.request_unclaimed = true;
        }
    }

    fn shift_output(&mut self) {
        if !self.silence {
            if self.shift_register & 1 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
            self.shift_register >>= 1;
        }

        self.bits_remaining -= 1;
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            match self.sample_buffer.take() {
                Some(sample) => {
                    self.shift_register = sample;
                    self.silence = false;
                }
                None => self.silence = true,
            }
        }
    }

    /// Hands a newly posted fetch address to the CPU, once.
    pub(super) fn take_request(&mut self) -> Option<u16> {
        if !self.request_unclaimed {
            return None;
        }
        self.request_unclaimed = false;
        self.pending_fetch
    }

    /// Byte read by the CPU on behalf of the channel.
    pub(super) fn finish_fetch(&mut self, byte: u8) {
        if self.pending_fetch.take().is_none() {
            return;
        }
        self.sample_buffer = Some(byte);
        // Disabled while the DMA was running: the byte still lands, but the
        // sample is already over.
        if self.bytes_remaining == 0 {
            return;
        }
        // The address wraps from $FFFF back to $8000.
        self.current_address = match self.current_address {
            0xFFFF => 0x8000,
            addr => addr + 1,
        };
        self.bytes_remaining -= 1;
        if self.bytes_remaining == 0 {
            if self.loop_flag {
                self.restart_sample();
            } else if self.irq_enable {
                self.irq_flag = true;
            }
        }
    }

    fn restart_sample(&mut self) {
        self.current_address = self.sample_address;
        self.bytes_remaining = self.sample_length;
    }

    pub(super) fn output(&self) -> u8 {
        self.output_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_with_sample(length: u8, control: u8) -> Dmc {
        let mut dmc = Dmc::default();
        dmc.write_control(control);
        dmc.write_sample_address(0x10);
        dmc.write_sample_length(length);
        dmc.set_enabled(true, false);
        dmc
    }

    #[test]
    fn fetch_is_requested_after_start_delay() {
        let mut dmc = enabled_with_sample(0, 0x0F);
        dmc.clock();
        assert_eq!(dmc.take_request(), None);
        dmc.clock();
        assert_eq!(dmc.take_request(), Some(0xC400));
        assert_eq!(dmc.take_request(), None);

        dmc.finish_fetch(0xAA);
        assert!(!dmc.active());
        for _ in 0..64 {
            dmc.clock();
        }
        assert_eq!(dmc.take_request(), None);
    }

    #[test]
    fn irq_raised_at_sample_end() {
        let mut dmc = enabled_with_sample(0, 0x80);
        dmc.clock();
        dmc.clock();
        assert!(dmc.take_request().is_some());
        dmc.finish_fetch(0);
        assert!(dmc.irq_flag);

        dmc.write_control(0x00);
        assert!(!dmc.irq_flag);
    }

    #[test]
    fn looping_sample_restarts() {
        let mut dmc = enabled_with_sample(1, 0x40);
        dmc.clock();
        dmc.clock();
        assert_eq!(dmc.take_request(), Some(0xC400));
        dmc.finish_fetch(0);
        assert_eq!(dmc.bytes_remaining, 16);
        assert_eq!(dmc.current_address, 0xC401);
    }

    #[test]
    fn disable_lands_after_two_or_three_cycles() {
        for (odd_cycle, delay) in [(false, 2), (true, 3)] {
            let mut dmc = enabled_with_sample(4, 0x00);
            dmc.set_enabled(false, odd_cycle);
            for _ in 1..delay {
                dmc.clock();
                assert!(dmc.active(), "odd {odd_cycle}");
            }
            dmc.clock();
            assert!(!dmc.active(), "odd {odd_cycle}");
        }
    }

    #[test]
    fn fetch_in_flight_does_not_revive_a_disabled_channel() {
        for control in [0x40, 0x80] {
            let mut dmc = enabled_with_sample(1, control);
            dmc.clock();
            dmc.clock();
            assert_eq!(dmc.take_request(), Some(0xC400));

            dmc.set_enabled(false, false);
            dmc.clock();
            dmc.clock();
            assert!(!dmc.active());

            dmc.finish_fetch(0x55);
            assert!(!dmc.active(), "control {control:#04X}");
            assert_eq!(dmc.bytes_remaining, 0);
            assert!(!dmc.irq_flag);
            assert_eq!(dmc.sample_buffer, Some(0x55));
        }
    }

    #[test]
    fn unclaimed_request_is_withdrawn_on_disable() {
        let mut dmc = enabled_with_sample(1, 0x00);
        dmc.clock();
        dmc.clock();
        dmc.set_enabled(false, false);
        dmc.clock();
        dmc.clock();
        assert_eq!(dmc.take_request(), None);
        assert_eq!(dmc.pending_fetch, None);
    }

    #[test]
    fn output_clamps_at_range_limits() {
        let mut dmc = Dmc::default();
        dmc.write_direct_load(126);
        dmc.shift_register = 0xFF;
        dmc.silence = false;
        dmc.shift_output();
        assert_eq!(dmc.output(), 126);

        dmc.write_direct_load(1);
        dmc.shift_register = 0x00;
        dmc.shift_output();
        assert_eq!(dmc.output(), 1);
    }
}
