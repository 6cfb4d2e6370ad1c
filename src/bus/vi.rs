use std::cmp::min;

use byteorder::{BigEndian, ByteOrder};

use crate::bus::mem_map::*;
use crate::bus::mi::{Intr, Mi};
use crate::bus::rcp::{FrameBuffer, FB_HEIGHT, FB_WIDTH};

const DEFAULT_WIDTH:  u32 = 320;
const DEFAULT_HEIGHT: u32 = 240;

// Fixed timing values the boot code expects to read back.
const BURST_VALUE:   u32 = 0x0001_0001;
const V_START_VALUE: u32 = 0x0000_0200;
const V_BURST_VALUE: u32 = 0x000c_000c;
const Y_SCALE_VALUE: u32 = 0x0000_0400;

#[derive(Debug)]
pub struct Vi {
    reg_control: u32,
    reg_origin:  u32,
    reg_width:   u32,
    reg_intr:    u32,
    reg_current: u32,
    reg_v_sync:  u32,
    reg_h_sync:  u32,
    reg_leap:    u32,
    reg_h_start: u32,
    reg_x_scale: u32,
    height:      u32,
}

impl Default for Vi {
    fn default() -> Vi {
        Vi {
            reg_control: 0,
            reg_origin:  0,
            reg_width:   DEFAULT_WIDTH,
            reg_intr:    0,
            reg_current: 0,
            reg_v_sync:  0,
            reg_h_sync:  0,
            reg_leap:    0,
            reg_h_start: 0,
            reg_x_scale: 0,
            height:      DEFAULT_HEIGHT,
        }
    }
}

impl Vi {
    pub fn read_reg(&self, addr: u32) -> u32 {
        match addr {
            // packed frame size instead of the control word
            VI_REG_STATUS   => (self.reg_width << 16) | self.height,
            VI_REG_ORIGIN   => self.reg_origin,
            VI_REG_H_WIDTH  => self.reg_width,
            VI_REG_V_INTR   => self.reg_intr,
            VI_REG_CURRENT  => self.reg_current,
            VI_REG_BURST    => BURST_VALUE,
            VI_REG_V_SYNC   => self.reg_v_sync,
            VI_REG_H_SYNC   => self.reg_h_sync,
            VI_REG_LEAP     => self.reg_leap,
            VI_REG_H_START  => self.reg_h_start,
            VI_REG_V_START  => V_START_VALUE,
            VI_REG_V_BURST  => V_BURST_VALUE,
            VI_REG_X_SCALE  => self.reg_x_scale,
            VI_REG_Y_SCALE  => Y_SCALE_VALUE,
            _ => 0,
        }
    }

    pub fn write_reg(&mut self, addr: u32, word: u32, mi: &mut Mi) {
        match addr {
            VI_REG_STATUS   => self.reg_control = word & 0xffff,
            VI_REG_ORIGIN   => self.reg_origin = word & 0xff_ffff,  // only 24 bits
            VI_REG_H_WIDTH  => self.reg_width = word & 0xfff,
            VI_REG_V_INTR   => self.reg_intr = word & 0x3ff,
            VI_REG_CURRENT  => {
                self.reg_current = word & 0x3ff;
                mi.clear_interrupt(Intr::VI);
            }
            VI_REG_V_SYNC   => self.reg_v_sync = word & 0x3ff,
            VI_REG_H_SYNC   => self.reg_h_sync = word & 0x1f_ffff,
            VI_REG_LEAP     => self.reg_leap = word & 0xfff_ffff,
            VI_REG_H_START  => self.reg_h_start = word & 0x3ff_ffff,
            VI_REG_X_SCALE  => self.reg_x_scale = word & 0xfff_ffff,
            _ => {}
        }
    }

    /// Bytes per pixel of the current mode; 0 means the output is blanked.
    fn pixel_size(&self) -> usize {
        match self.reg_control & 0b11 {
            0b10 => 2,
            0b11 => 4,
            _    => 0,
        }
    }

    /// Converts the frame at ORIGIN into RGBA8888 rows of the framebuffer.
    pub fn scanout(&self, ram: &[u8], fb: &FrameBuffer) {
        let pixel_size = self.pixel_size();
        if pixel_size == 0 || self.reg_width == 0 {
            return;
        }
        let stride = self.reg_width as usize;
        let width = min(stride, FB_WIDTH);
        let height = min(self.height as usize, FB_HEIGHT);
        let origin = self.reg_origin as usize;
        fb.with_locked(|pixels| {
            'rows: for y in 0..height {
                for x in 0..width {
                    let src = origin + (y * stride + x) * pixel_size;
                    if src + pixel_size > ram.len() {
                        break 'rows;
                    }
                    let dst = (y * FB_WIDTH + x) * 4;
                    let rgba = if pixel_size == 2 {
                        rgba5551_to_8888(BigEndian::read_u16(&ram[src..]))
                    } else {
                        [ram[src], ram[src + 1], ram[src + 2], 0xff]
                    };
                    pixels[dst..dst + 4].copy_from_slice(&rgba);
                }
            }
        });
    }
}

fn rgba5551_to_8888(pixel: u16) -> [u8; 4] {
    let expand = |c: u16| {
        let c = (c & 0x1f) as u8;
        (c << 3) | (c >> 2)
    };
    // alpha is coverage, which the VI does not display
    [expand(pixel >> 11), expand(pixel >> 6), expand(pixel >> 1), 0xff]
}
