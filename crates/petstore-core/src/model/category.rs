//! Enumerated categories and their storage codes

use serde::Serialize;

use crate::errors::{PetStoreError, Result};

/// Kind of product sold in a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Accessory,
    Food,
    Cleaning,
}

impl ProductType {
    pub const ALL: [ProductType; 3] = [
        ProductType::Accessory,
        ProductType::Food,
        ProductType::Cleaning,
    ];

    /// Code stored in `product.type`
    pub fn as_code(self) -> &'static str {
        match self {
            ProductType::Accessory => "accessory",
            ProductType::Food => "food",
            ProductType::Cleaning => "cleaning",
        }
    }

    /// # Errors
    ///
    /// Returns `Codec` for a code no variant maps to.
    pub fn from_code(code: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_code() == code)
            .ok_or_else(|| PetStoreError::Codec {
                category: "product type".to_string(),
                code: code.to_string(),
            })
    }
}

/// Water a fish lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LivingEnv {
    FreshWater,
    SeaWater,
}

impl LivingEnv {
    pub const ALL: [LivingEnv; 2] = [LivingEnv::FreshWater, LivingEnv::SeaWater];

    /// Code stored in `fish.living_env`
    pub fn as_code(self) -> &'static str {
        match self {
            LivingEnv::FreshWater => "fresh_water",
            LivingEnv::SeaWater => "sea_water",
        }
    }

    /// # Errors
    ///
    /// Returns `Codec` for a code no variant maps to.
    pub fn from_code(code: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_code() == code)
            .ok_or_else(|| PetStoreError::Codec {
                category: "living environment".to_string(),
                code: code.to_string(),
            })
    }
}
