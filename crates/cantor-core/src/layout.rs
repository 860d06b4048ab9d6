//! Channel layouts: a channel count plus the speaker positions it covers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::{BitOr, BitOrAssign};

/// Speaker position bit set, using the WAVE `dwChannelMask` assignments.
///
/// Channels of a layout are stored in ascending bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelMask(pub u32);

impl ChannelMask {
    pub const NONE: Self = Self(0);
    pub const FRONT_LEFT: Self = Self(0x1);
    pub const FRONT_RIGHT: Self = Self(0x2);
    pub const FRONT_CENTER: Self = Self(0x4);
    pub const LOW_FREQUENCY: Self = Self(0x8);
    pub const BACK_LEFT: Self = Self(0x10);
    pub const BACK_RIGHT: Self = Self(0x20);
    pub const FRONT_LEFT_OF_CENTER: Self = Self(0x40);
    pub const FRONT_RIGHT_OF_CENTER: Self = Self(0x80);
    pub const BACK_CENTER: Self = Self(0x100);
    pub const SIDE_LEFT: Self = Self(0x200);
    pub const SIDE_RIGHT: Self = Self(0x400);
    pub const TOP_CENTER: Self = Self(0x800);
    pub const TOP_FRONT_LEFT: Self = Self(0x1000);
    pub const TOP_FRONT_CENTER: Self = Self(0x2000);
    pub const TOP_FRONT_RIGHT: Self = Self(0x4000);
    pub const TOP_BACK_LEFT: Self = Self(0x8000);
    pub const TOP_BACK_CENTER: Self = Self(0x10000);
    pub const TOP_BACK_RIGHT: Self = Self(0x20000);

    /// Every position this engine knows how to route.
    pub const ALL: Self = Self(0x3FFFF);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Single-bit masks in channel order.
    pub fn positions(self) -> SmallVec<[ChannelMask; 8]> {
        (0..32)
            .map(|bit| Self(1 << bit))
            .filter(|pos| self.contains(*pos))
            .collect()
    }

    pub(crate) fn side(self) -> Side {
        match self {
            Self::FRONT_LEFT
            | Self::BACK_LEFT
            | Self::FRONT_LEFT_OF_CENTER
            | Self::SIDE_LEFT
            | Self::TOP_FRONT_LEFT
            | Self::TOP_BACK_LEFT => Side::Left,
            Self::FRONT_RIGHT
            | Self::BACK_RIGHT
            | Self::FRONT_RIGHT_OF_CENTER
            | Self::SIDE_RIGHT
            | Self::TOP_FRONT_RIGHT
            | Self::TOP_BACK_RIGHT => Side::Right,
            _ => Side::Center,
        }
    }

    pub(crate) fn zone(self) -> Zone {
        match self {
            Self::FRONT_LEFT
            | Self::FRONT_RIGHT
            | Self::FRONT_CENTER
            | Self::FRONT_LEFT_OF_CENTER
            | Self::FRONT_RIGHT_OF_CENTER
            | Self::LOW_FREQUENCY => Zone::Front,
            Self::SIDE_LEFT | Self::SIDE_RIGHT => Zone::Side,
            Self::BACK_LEFT | Self::BACK_RIGHT | Self::BACK_CENTER => Zone::Back,
            _ => Zone::Top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Zone {
    Front,
    Side,
    Back,
    Top,
}

impl BitOr for ChannelMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChannelMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Channel count plus positional mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLayout {
    pub count: u16,
    pub mask: ChannelMask,
}

impl ChannelLayout {
    pub const MONO: Self = Self::from_mask(ChannelMask::FRONT_CENTER);
    pub const STEREO: Self = Self::from_mask(ChannelMask(0x3));
    pub const LAYOUT_2_1: Self = Self::from_mask(ChannelMask(0xB));
    pub const SURROUND: Self = Self::from_mask(ChannelMask(0x7));
    pub const QUAD: Self = Self::from_mask(ChannelMask(0x33));
    pub const LAYOUT_4_0: Self = Self::from_mask(ChannelMask(0x107));
    pub const LAYOUT_5_0: Self = Self::from_mask(ChannelMask(0x607));
    pub const LAYOUT_5_1: Self = Self::from_mask(ChannelMask(0x60F));
    pub const LAYOUT_5_1_BACK: Self = Self::from_mask(ChannelMask(0x3F));
    pub const LAYOUT_6_1: Self = Self::from_mask(ChannelMask(0x70F));
    pub const LAYOUT_7_1: Self = Self::from_mask(ChannelMask(0x63F));

    pub const fn from_mask(mask: ChannelMask) -> Self {
        Self {
            count: mask.0.count_ones() as u16,
            mask,
        }
    }

    /// Layout with `count` channels and no positional information.
    pub const fn unpositioned(count: u16) -> Self {
        Self {
            count,
            mask: ChannelMask::NONE,
        }
    }

    /// The conventional layout for a channel count, if there is one.
    pub fn default_for(count: u16) -> Option<Self> {
        match count {
            1 => Some(Self::MONO),
            2 => Some(Self::STEREO),
            3 => Some(Self::SURROUND),
            4 => Some(Self::QUAD),
            5 => Some(Self::LAYOUT_5_0),
            6 => Some(Self::LAYOUT_5_1),
            7 => Some(Self::LAYOUT_6_1),
            8 => Some(Self::LAYOUT_7_1),
            _ => None,
        }
    }

    /// Look up a named layout (`"mono"`, `"stereo"`, `"5.1"`, ...).
    pub fn by_name(name: &str) -> Option<Self> {
        let layout = match name {
            "mono" => Self::MONO,
            "stereo" => Self::STEREO,
            "2.1" => Self::LAYOUT_2_1,
            "surround" | "3.0" => Self::SURROUND,
            "quad" => Self::QUAD,
            "4.0" => Self::LAYOUT_4_0,
            "5.0" => Self::LAYOUT_5_0,
            "5.1" => Self::LAYOUT_5_1,
            "5.1back" => Self::LAYOUT_5_1_BACK,
            "6.1" => Self::LAYOUT_6_1,
            "7.1" => Self::LAYOUT_7_1,
            _ => return None,
        };
        Some(layout)
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.count as usize
    }

    /// Speaker position of every channel, in channel order.
    ///
    /// Unpositioned layouts fall back to [`ChannelLayout::default_for`].
    pub fn positions(&self) -> Result<SmallVec<[ChannelMask; 8]>> {
        if self.mask.count() == self.channels() && !self.mask.is_empty() {
            if !ChannelMask::ALL.contains(self.mask) {
                return Err(Error::Fail(format!(
                    "unmapped channel mask {:#x}",
                    self.mask.bits()
                )));
            }
            return Ok(self.mask.positions());
        }

        Self::default_for(self.count)
            .map(|layout| layout.mask.positions())
            .ok_or_else(|| {
                Error::Fail(format!(
                    "no channel mapping for {} channels with mask {:#x}",
                    self.count,
                    self.mask.bits()
                ))
            })
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::STEREO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_counts() {
        assert_eq!(ChannelLayout::MONO.count, 1);
        assert_eq!(ChannelLayout::STEREO.count, 2);
        assert_eq!(ChannelLayout::LAYOUT_5_1.count, 6);
        assert_eq!(ChannelLayout::LAYOUT_7_1.count, 8);
    }

    #[test]
    fn test_positions_in_bit_order() {
        let positions = ChannelLayout::LAYOUT_5_1.positions().unwrap();
        assert_eq!(
            positions.as_slice(),
            &[
                ChannelMask::FRONT_LEFT,
                ChannelMask::FRONT_RIGHT,
                ChannelMask::FRONT_CENTER,
                ChannelMask::LOW_FREQUENCY,
                ChannelMask::SIDE_LEFT,
                ChannelMask::SIDE_RIGHT,
            ]
        );
    }

    #[test]
    fn test_unpositioned_falls_back_to_default() {
        let layout = ChannelLayout::unpositioned(2);
        assert_eq!(
            layout.positions().unwrap().as_slice(),
            &[ChannelMask::FRONT_LEFT, ChannelMask::FRONT_RIGHT]
        );
    }

    #[test]
    fn test_unmapped_layout_is_error() {
        assert!(ChannelLayout::unpositioned(12).positions().is_err());
        let bogus = ChannelLayout {
            count: 1,
            mask: ChannelMask(0x8000_0000),
        };
        assert!(bogus.positions().is_err());
    }

    #[test]
    fn test_by_name() {
        assert_eq!(ChannelLayout::by_name("5.1"), Some(ChannelLayout::LAYOUT_5_1));
        assert_eq!(ChannelLayout::by_name("9.2"), None);
    }
}
