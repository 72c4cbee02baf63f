//! Table definitions and row codecs for the non-polymorphic entities

use crate::errors::{PetStoreError, Result};
use crate::model::{Address, EntityId, PetStore, Product, ProductType};

use super::row::{KeyKind, Row, TableDef};

pub const ADDRESS: TableDef = TableDef {
    name: "address",
    key: KeyKind::Generated,
    columns: &["id", "number", "street", "zip_code", "city"],
};

pub const STORE: TableDef = TableDef {
    name: "store",
    key: KeyKind::Generated,
    columns: &["id", "name", "manager_name", "address_id"],
};

pub const ANIMAL: TableDef = TableDef {
    name: "animal",
    key: KeyKind::Generated,
    columns: &["id", "birth_date", "color", "store_id"],
};

pub const PRODUCT: TableDef = TableDef {
    name: "product",
    key: KeyKind::Generated,
    columns: &["id", "code", "label", "type", "price"],
};

pub const STORE_PRODUCT: TableDef = TableDef {
    name: "store_product",
    key: KeyKind::Composite,
    columns: &["store_id", "product_id"],
};

/// Every table in foreign-key order, variant tables included
pub fn all_tables() -> Vec<TableDef> {
    let mut tables = vec![ADDRESS, STORE, ANIMAL];
    tables.extend(super::hierarchy::VARIANT_TABLES.iter().map(|v| v.table));
    tables.push(PRODUCT);
    tables.push(STORE_PRODUCT);
    tables
}

pub fn address_row(address: &Address) -> Row {
    Row::new(ADDRESS.name)
        .with("number", address.number.as_str())
        .with("street", address.street.as_str())
        .with("zip_code", address.zip_code.as_str())
        .with("city", address.city.as_str())
}

/// # Errors
///
/// Returns `InvalidColumn` when a column is missing or mistyped.
pub fn decode_address(row: &Row) -> Result<(EntityId, Address)> {
    let address = Address::new(
        row.text("number")?,
        row.text("street")?,
        row.text("zip_code")?,
        row.text("city")?,
    );
    Ok((row.id()?, address))
}

pub fn store_row(store: &PetStore, address_id: Option<EntityId>) -> Row {
    Row::new(STORE.name)
        .with("name", store.name.as_str())
        .with("manager_name", store.manager_name.as_str())
        .with("address_id", address_id)
}

/// Decoded store plus the raw `address_id` foreign key
///
/// # Errors
///
/// Returns `InvalidColumn` when a column is missing or mistyped.
pub fn decode_store(row: &Row) -> Result<(EntityId, PetStore, Option<EntityId>)> {
    let store = PetStore::new(row.text("name")?, row.text("manager_name")?);
    let address_id = row.opt_integer("address_id")?.map(EntityId);
    Ok((row.id()?, store, address_id))
}

/// # Errors
///
/// Returns `InvalidInput` for a NaN or infinite price.
pub fn product_row(product: &Product) -> Result<Row> {
    if !product.price.is_finite() {
        return Err(PetStoreError::InvalidInput {
            reason: format!("product '{}' has non-finite price {}", product.code, product.price),
        });
    }
    Ok(Row::new(PRODUCT.name)
        .with("code", product.code.as_str())
        .with("label", product.label.as_str())
        .with("type", product.product_type.as_code())
        .with("price", product.price))
}

/// # Errors
///
/// Returns `InvalidColumn` for missing/mistyped columns, `Codec` for an
/// unknown product type.
pub fn decode_product(row: &Row) -> Result<(EntityId, Product)> {
    let product = Product::new(
        row.text("code")?,
        row.text("label")?,
        ProductType::from_code(row.text("type")?)?,
        row.real("price")?,
    );
    Ok((row.id()?, product))
}

pub fn store_product_row(store_id: EntityId, product_id: EntityId) -> Row {
    Row::new(STORE_PRODUCT.name)
        .with("store_id", store_id)
        .with("product_id", product_id)
}

/// # Errors
///
/// Returns `InvalidColumn` when a key column is missing or mistyped.
pub fn decode_store_product(row: &Row) -> Result<(EntityId, EntityId)> {
    Ok((
        EntityId(row.integer("store_id")?),
        EntityId(row.integer("product_id")?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_row_carries_address_fk() {
        let store = PetStore::new("Baba", "Dialo");
        let row = store_row(&store, Some(EntityId(3)));
        assert_eq!(row.table, "store");
        assert_eq!(row.integer("address_id").unwrap(), 3);

        let detached = store_row(&store, None);
        assert_eq!(detached.opt_integer("address_id").unwrap(), None);
    }

    #[test]
    fn test_product_codec() {
        let product = Product::new("2", "bio", ProductType::Food, 30.99);
        let row = product_row(&product).unwrap().with("id", 8_i64);
        assert_eq!(row.text("type").unwrap(), "food");

        let (id, decoded) = decode_product(&row).unwrap();
        assert_eq!(id, EntityId(8));
        assert!(decoded.same_fields(&product));
    }

    #[test]
    fn test_non_finite_price_rejected() {
        let product = Product::new("x", "broken", ProductType::Food, f64::NAN);
        assert!(matches!(
            product_row(&product),
            Err(PetStoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_unknown_product_type_is_codec_error() {
        let row = Row::new("product")
            .with("id", 1_i64)
            .with("code", "1")
            .with("label", "eco")
            .with("type", "toy")
            .with("price", 1.0);
        assert!(matches!(decode_product(&row), Err(PetStoreError::Codec { .. })));
    }

    #[test]
    fn test_insert_rows_match_table_columns() {
        let address = Address::new("3B", "Impasse des moutons", "83500", "La Seyne sur Mer");
        let names: Vec<&str> = address_row(&address).values.iter().map(|(c, _)| *c).collect();
        assert_eq!(names, ADDRESS.insert_columns());

        let names: Vec<&str> = store_product_row(EntityId(1), EntityId(2))
            .values
            .iter()
            .map(|(c, _)| *c)
            .collect();
        assert_eq!(names, STORE_PRODUCT.insert_columns());
    }

    #[test]
    fn test_all_tables_in_fk_order() {
        let names: Vec<&str> = all_tables().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["address", "store", "animal", "cat", "fish", "product", "store_product"]
        );
    }
}
