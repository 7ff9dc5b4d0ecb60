//! Logical signal model
//!
//! Axis bitsets, signal snapshots reported to the planner, and the table
//! that binds logical pin functions to physical ports.

pub mod pin;
pub mod table;

pub use pin::*;
pub use table::*;

use core::ops::{BitAnd, BitOr, BitXor, Not};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of supported axes (X, Y, Z, A, B, C)
pub const N_AXIS: usize = 6;

/// Machine axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
    A,
    B,
    C,
}

impl Axis {
    /// All axes in bit order
    pub const ALL: [Axis; N_AXIS] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    /// Bit position of this axis in an [`AxisMask`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Single-axis mask
    pub const fn mask(self) -> AxisMask {
        AxisMask(1 << self as u8)
    }

    /// Axis letter
    pub const fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::A => 'A',
            Axis::B => 'B',
            Axis::C => 'C',
        }
    }
}

/// Bitset over axes, bit 0 = X
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisMask(pub u8);

impl AxisMask {
    pub const NONE: Self = Self(0);
    pub const X: Self = Axis::X.mask();
    pub const Y: Self = Axis::Y.mask();
    pub const Z: Self = Axis::Z.mask();
    pub const A: Self = Axis::A.mask();
    pub const B: Self = Axis::B.mask();
    pub const C: Self = Axis::C.mask();
    pub const ALL: Self = Self((1 << N_AXIS) - 1);

    /// Build from raw bits, dropping bits beyond the last axis
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, axis: Axis) -> bool {
        self.0 & (1 << axis as u8) != 0
    }

    /// Copy with `axis` set or cleared
    pub const fn with(self, axis: Axis, on: bool) -> Self {
        if on {
            Self(self.0 | (1 << axis as u8))
        } else {
            Self(self.0 & !(1 << axis as u8))
        }
    }

    /// Axes whose bit is set
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl BitAnd for AxisMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for AxisMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitXor for AxisMask {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for AxisMask {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

/// Limit switch snapshot, one mask per switch position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitSignals {
    pub min: AxisMask,
    pub min2: AxisMask,
    pub max: AxisMask,
    pub max2: AxisMask,
}

impl LimitSignals {
    /// Axes with any switch triggered
    pub fn merge(&self) -> AxisMask {
        self.min | self.min2 | self.max | self.max2
    }
}

/// Control input snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlSignals(pub u16);

impl ControlSignals {
    pub const NONE: Self = Self(0);
    pub const RESET: Self = Self(1 << 0);
    pub const FEED_HOLD: Self = Self(1 << 1);
    pub const CYCLE_START: Self = Self(1 << 2);
    pub const SAFETY_DOOR_AJAR: Self = Self(1 << 3);
    pub const BLOCK_DELETE: Self = Self(1 << 4);
    pub const STOP_DISABLE: Self = Self(1 << 5);
    pub const E_STOP: Self = Self(1 << 6);
    pub const PROBE_DISCONNECTED: Self = Self(1 << 7);
    pub const MOTOR_FAULT: Self = Self(1 << 8);
    pub const MOTOR_WARNING: Self = Self(1 << 9);
    pub const LIMITS_OVERRIDE: Self = Self(1 << 10);
    pub const SINGLE_BLOCK: Self = Self(1 << 11);
    pub const PROBE_TRIGGERED: Self = Self(1 << 12);
    /// The reporting input went inactive (change-mode aux controls)
    pub const DEASSERTED: Self = Self(1 << 15);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Copy with `bits` set or cleared
    pub const fn with(self, bits: Self, on: bool) -> Self {
        if on {
            Self(self.0 | bits.0)
        } else {
            Self(self.0 & !bits.0)
        }
    }
}

impl BitOr for ControlSignals {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Spindle on/direction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpindleState {
    pub on: bool,
    pub ccw: bool,
}

/// Coolant outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoolantState {
    pub flood: bool,
    pub mist: bool,
}

/// Probe input state as seen by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProbeState {
    pub triggered: bool,
    pub connected: bool,
    /// Effective inversion for the current probing direction
    pub inverted: bool,
    pub is_probing: bool,
}
