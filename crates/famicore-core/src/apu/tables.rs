//! Lookup tables shared by the APU channels (NTSC timings).

/// Length counter load values indexed by the top five bits of the length
/// register.
#[rustfmt::skip]
pub(super) const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20,  2, 40,  4, 80,  6, 160,  8, 60, 10, 14, 12, 26, 14,
    12,  16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

/// Pulse waveforms for the four duty settings.
#[rustfmt::skip]
pub(super) const PULSE_DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

#[rustfmt::skip]
pub(super) const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10,  9,  8,  7,  6,  5,  4,  3,  2,  1,  0,
     0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 10, 11, 12, 13, 14, 15,
];

/// Noise timer periods in CPU cycles.
#[rustfmt::skip]
pub(super) const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// DMC bit periods in CPU cycles.
#[rustfmt::skip]
pub(super) const DMC_RATE_TABLE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

/// `$4012` selects a sample start at `$C000 + value * 64`.
pub(super) const DMC_SAMPLE_BASE: u16 = 0xC000;
pub(super) const DMC_SAMPLE_ADDR_STRIDE: u16 = 64;
/// `$4013` selects a sample length of `value * 16 + 1` bytes.
pub(super) const DMC_SAMPLE_LEN_STRIDE: u16 = 16;
