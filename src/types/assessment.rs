//! Post-bake assessment attached to the terminal event

use serde::{Deserialize, Serialize};

/// How far the dough was proofed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofLevel {
    #[serde(rename = "underproofed", alias = "under")]
    Under,
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "overproofed", alias = "over")]
    Over,
}

/// Crust colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browning {
    None,
    Slight,
    Good,
    Over,
}

/// Post-bake evaluation, stored as the payload of `loaf-complete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub proof_level: ProofLevel,
    /// 1-10
    pub crumb_quality: u8,
    pub browning: Browning,
    /// Overall score, 1-10
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
