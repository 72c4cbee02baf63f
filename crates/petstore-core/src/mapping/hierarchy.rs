//! Joined-table mapping of the animal hierarchy
//!
//! Every animal is one `animal` base row plus exactly one row in the table
//! of its variant, both keyed by the same id. A new variant needs its
//! table definition, an entry in [`VARIANT_TABLES`], and one arm in each
//! of [`variant_table`], [`variant_row`] and [`decode_variant`]. Base-row
//! handling does not change.

use crate::errors::{PetStoreError, Result};
use crate::model::{Animal, AnimalVariant, EntityId, LivingEnv, VariantKind};

use super::row::{KeyKind, Row, TableDef};
use super::tables::ANIMAL;

/// A variant and the table holding its columns
#[derive(Debug, Clone, Copy)]
pub struct VariantTable {
    pub kind: VariantKind,
    pub table: TableDef,
}

pub const CAT: TableDef = TableDef {
    name: "cat",
    key: KeyKind::Shared,
    columns: &["id", "chip_id"],
};

pub const FISH: TableDef = TableDef {
    name: "fish",
    key: KeyKind::Shared,
    columns: &["id", "living_env"],
};

pub const VARIANT_TABLES: [VariantTable; 2] = [
    VariantTable {
        kind: VariantKind::Cat,
        table: CAT,
    },
    VariantTable {
        kind: VariantKind::Fish,
        table: FISH,
    },
];

/// Table holding the columns of `kind`
pub fn variant_table(kind: VariantKind) -> &'static TableDef {
    match kind {
        VariantKind::Cat => &CAT,
        VariantKind::Fish => &FISH,
    }
}

/// Variant stored in `table`
///
/// # Errors
///
/// Returns `UnknownVariant` if no variant uses that table.
pub fn variant_for_table(table: &str) -> Result<VariantKind> {
    VARIANT_TABLES
        .iter()
        .find(|v| v.table.name == table)
        .map(|v| v.kind)
        .ok_or_else(|| PetStoreError::UnknownVariant {
            table: table.to_string(),
        })
}

/// Shared columns of an animal, without its id
pub fn base_row(animal: &Animal, store_id: Option<EntityId>) -> Row {
    Row::new(ANIMAL.name)
        .with("birth_date", animal.birth_date)
        .with("color", animal.color.as_str())
        .with("store_id", store_id)
}

/// Variant row keyed by the id the base row received
pub fn variant_row(animal: &Animal, id: EntityId) -> Row {
    let table = variant_table(animal.kind()).name;
    let row = Row::new(table).with("id", id);
    match &animal.variant {
        AnimalVariant::Cat { chip_id } => row.with("chip_id", chip_id.as_str()),
        AnimalVariant::Fish { living_env } => row.with("living_env", living_env.as_code()),
    }
}

/// Interpret a variant row
///
/// # Errors
///
/// * `UnknownVariant` - If the row's table is not a variant table
/// * `InvalidColumn` / `Codec` - If a variant column cannot be read
pub fn decode_variant(row: &Row) -> Result<AnimalVariant> {
    match variant_for_table(row.table)? {
        VariantKind::Cat => Ok(AnimalVariant::Cat {
            chip_id: row.text("chip_id")?.to_string(),
        }),
        VariantKind::Fish => Ok(AnimalVariant::Fish {
            living_env: LivingEnv::from_code(row.text("living_env")?)?,
        }),
    }
}

/// Rebuild an animal from its base row and every variant row sharing its id
///
/// Returns the id, the animal, and the raw `store_id` foreign key.
///
/// # Errors
///
/// * `VariantMismatch` - If `matches` holds zero rows or more than one
/// * `InvalidColumn` / `Codec` / `UnknownVariant` - If a row cannot be read
pub fn decode_animal(base: &Row, matches: &[&Row]) -> Result<(EntityId, Animal, Option<EntityId>)> {
    let id = base.id()?;
    let variant_row = match matches {
        [only] => *only,
        _ => {
            return Err(PetStoreError::VariantMismatch {
                animal_id: id.value(),
                matches: matches.iter().map(|r| r.table.to_string()).collect(),
            })
        }
    };
    if variant_row.id()? != id {
        return Err(PetStoreError::InvalidColumn {
            table: variant_row.table.to_string(),
            column: "id".to_string(),
            reason: format!("does not match base row {}", id),
        });
    }

    let animal = Animal::new(
        base.date("birth_date")?,
        base.text("color")?,
        decode_variant(variant_row)?,
    );
    let store_id = base.opt_integer("store_id")?.map(EntityId);
    Ok((id, animal, store_id))
}
