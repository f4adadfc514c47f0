//! Free/occupied transitions expressed as color updates.
//!
//! A slot has no status column. It is free while `color == default_color`
//! and occupied otherwise, so each transition is a conditional color rewrite.

use crate::slot::SlotKey;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Free,
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Free,
    Occupy,
}

/// Which stored column the caller's color is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchColumn {
    Color,
    DefaultColor,
}

impl MatchColumn {
    pub(crate) fn column(self) -> &'static str {
        match self {
            MatchColumn::Color => "color",
            MatchColumn::DefaultColor => "default_color",
        }
    }
}

/// The color written when the update applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorTarget {
    DefaultColor,
    Fixed(String),
}

/// A compare-and-set on one stored slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorUpdate {
    pub warehouse: String,
    pub number: i64,
    pub match_column: MatchColumn,
    pub match_color: String,
    pub target: ColorTarget,
}

impl Transition {
    pub fn target_state(self) -> SlotState {
        match self {
            Transition::Free => SlotState::Free,
            Transition::Occupy => SlotState::Occupied,
        }
    }

    /// Builds the store update for this transition.
    ///
    /// `free` matches on the slot's current color and restores its default.
    /// `occupy` matches on the default color and writes the occupied marker.
    pub fn color_update(self, key: &SlotKey, occupied_color: &str) -> ColorUpdate {
        let (match_column, target) = match self {
            Transition::Free => (MatchColumn::Color, ColorTarget::DefaultColor),
            Transition::Occupy => (
                MatchColumn::DefaultColor,
                ColorTarget::Fixed(occupied_color.to_string()),
            ),
        };

        ColorUpdate {
            warehouse: key.warehouse().to_string(),
            number: key.number(),
            match_column,
            match_color: key.color().to_string(),
            target,
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Free => write!(f, "free"),
            Transition::Occupy => write!(f, "occupy"),
        }
    }
}
