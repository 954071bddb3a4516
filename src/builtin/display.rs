//! Displays.
//!
//! The pixel displays and the SSD share one double-buffered behaviour. On a
//! rising clock edge RESET clears the back buffer, otherwise WRITE stores
//! the input word at the addressed cell; REFRESH then copies the back buffer
//! to the front. Read-out pins always show the front buffer at the current
//! address, so a frame drawn into the back buffer becomes visible all at
//! once.
//!
//! LED and seven-segment displays only latch their inputs for a front end
//! to read; they drive no pins.

use super::{input_high, input_value, put, region, rising_edge, set_output, word};
use crate::common::PinState;

/// Layout of a double-buffered cell array inside a state buffer.
#[derive(Clone, Copy, Debug)]
struct Framebuffer {
    cells: usize,
}

impl Framebuffer {
    const PREV_CLOCK: usize = 0;
    const BACK: usize = 1;

    const fn state_len(self) -> usize {
        Self::BACK + 2 * self.cells
    }

    const fn front(self) -> usize {
        Self::BACK + self.cells
    }

    fn update(self, state: &mut [u32], address: usize, value: u32, control: &Control) {
        if !rising_edge(state, Self::PREV_CLOCK, control.clock) {
            return;
        }
        {
            let back = region(state, Self::BACK, self.cells);
            if control.reset {
                back.fill(0);
            } else if control.write {
                if let Some(cell) = back.get_mut(address) {
                    *cell = value;
                }
            }
        }
        if control.refresh && state.len() >= self.state_len() {
            state.copy_within(Self::BACK..self.front(), self.front());
        }
    }

    fn front_cell(self, state: &[u32], address: usize) -> u32 {
        if address >= self.cells {
            return 0;
        }
        word(state, self.front() + address)
    }
}

/// Control lines shared by every double-buffered display.
struct Control {
    reset: bool,
    write: bool,
    refresh: bool,
    clock: bool,
}

impl Control {
    /// Reads RESET, WRITE, REFRESH and CLOCK from four consecutive inputs.
    fn read(inputs: &[PinState], first: usize) -> Self {
        Self {
            reset: input_high(inputs, first),
            write: input_high(inputs, first + 1),
            refresh: input_high(inputs, first + 2),
            clock: input_high(inputs, first + 3),
        }
    }
}

const RGB: Framebuffer = Framebuffer { cells: 256 };
const LARGE_RGB: Framebuffer = Framebuffer { cells: 64 * 64 };
const DOT: Framebuffer = Framebuffer { cells: 256 };
const SSD: Framebuffer = Framebuffer { cells: 16 * 256 };

pub const RGB_STATE_LEN: usize = RGB.state_len();
pub const LARGE_RGB_STATE_LEN: usize = LARGE_RGB.state_len();
pub const DOT_STATE_LEN: usize = DOT.state_len();
pub const SSD_STATE_LEN: usize = SSD.state_len();
pub const LED_STATE_LEN: usize = 1;
pub const SEVEN_SEGMENT_STATE_LEN: usize = 1;

/// Side length of the large RGB display.
pub const LARGE_SIDE: usize = 64;

/// 16x16 display with 4-bit colour channels.
pub fn rgb(inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let address = (input_value(inputs, 0) & 0xFF) as usize;
    let r = (input_value(inputs, 1) & 0xF) as u32;
    let g = (input_value(inputs, 2) & 0xF) as u32;
    let b = (input_value(inputs, 3) & 0xF) as u32;
    RGB.update(state, address, r << 8 | g << 4 | b, &Control::read(inputs, 4));

    let (r, g, b) = rgb_pixel(state, address);
    set_output(outputs, 0, PinState::from_value(r as u64));
    set_output(outputs, 1, PinState::from_value(g as u64));
    set_output(outputs, 2, PinState::from_value(b as u64));
}

/// 64x64 display with 8-bit channels, addressed by X and Y modulo 64.
pub fn large_rgb(inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let x = input_value(inputs, 0) as usize % LARGE_SIDE;
    let y = input_value(inputs, 1) as usize % LARGE_SIDE;
    let r = (input_value(inputs, 2) & 0xFF) as u32;
    let g = (input_value(inputs, 3) & 0xFF) as u32;
    let b = (input_value(inputs, 4) & 0xFF) as u32;
    let address = y * LARGE_SIDE + x;
    LARGE_RGB.update(state, address, r << 16 | g << 8 | b, &Control::read(inputs, 5));

    let (r, g, b) = large_rgb_pixel(state, x, y);
    set_output(outputs, 0, PinState::from_value(r as u64));
    set_output(outputs, 1, PinState::from_value(g as u64));
    set_output(outputs, 2, PinState::from_value(b as u64));
}

/// 16x16 monochrome display.
pub fn dot(inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let address = (input_value(inputs, 0) & 0xFF) as usize;
    let pixel = input_high(inputs, 1) as u32;
    DOT.update(state, address, pixel, &Control::read(inputs, 2));
    set_output(outputs, 0, PinState::from_bool(dot_pixel(state, address)));
}

/// Storage display: 16 banks of 256 bytes.
pub fn ssd(inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let bank = (input_value(inputs, 0) & 0xF) as usize;
    let address = bank * 256 + (input_value(inputs, 1) & 0xFF) as usize;
    let data = (input_value(inputs, 2) & 0xFF) as u32;
    SSD.update(state, address, data, &Control::read(inputs, 3));
    let value = SSD.front_cell(state, address) & 0xFF;
    set_output(outputs, 0, PinState::from_value(value as u64));
}

pub fn led(inputs: &[PinState], state: &mut [u32]) {
    put(state, 0, input_high(inputs, 0) as u32);
}

/// Latches segments A..G and DP as bits 0..7.
pub fn seven_segment(inputs: &[PinState], state: &mut [u32]) {
    let mask = (0..8).fold(0u32, |acc, i| acc | (input_high(inputs, i) as u32) << i);
    put(state, 0, mask);
}

// ----------------------------------------------------------------------
// Front-end read-out
// ----------------------------------------------------------------------

/// Visible colour of a 16x16 RGB pixel.
pub fn rgb_pixel(state: &[u32], address: usize) -> (u8, u8, u8) {
    let cell = RGB.front_cell(state, address);
    (((cell >> 8) & 0xF) as u8, ((cell >> 4) & 0xF) as u8, (cell & 0xF) as u8)
}

/// Visible colour of a large-display pixel.
pub fn large_rgb_pixel(state: &[u32], x: usize, y: usize) -> (u8, u8, u8) {
    let cell = LARGE_RGB.front_cell(state, (y % LARGE_SIDE) * LARGE_SIDE + x % LARGE_SIDE);
    ((cell >> 16) as u8, (cell >> 8) as u8, cell as u8)
}

pub fn dot_pixel(state: &[u32], address: usize) -> bool {
    DOT.front_cell(state, address) != 0
}

pub fn led_lit(state: &[u32]) -> bool {
    word(state, 0) != 0
}

/// Lit segments, A in bit 0 through DP in bit 7.
pub fn seven_segment_mask(state: &[u32]) -> u8 {
    word(state, 0) as u8
}
