//! Product catalog
//!
//! Stock quantity is read-only here: it only moves through the stock
//! ledger. Products are deactivated rather than deleted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{Product, Unit};

const PRODUCT_COLUMNS: &str = "id, name, description, unit_price, stock_quantity, unit, \
     barcode, min_stock_level, expiration_date, is_active, created_at, updated_at";

/// Input for creating a product
#[derive(Debug, Deserialize, validator::Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub unit_price: Decimal,
    pub unit: Unit,
    pub barcode: Option<String>,
    pub min_stock_level: Option<i32>,
    pub expiration_date: Option<NaiveDate>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub unit: Option<Unit>,
    pub barcode: Option<String>,
    pub min_stock_level: Option<i32>,
    pub expiration_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product (initial stock arrives through a stock entry)
    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        validator::Validate::validate(&input)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        if input.unit_price < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "unit_price".to_string(),
                message: "Unit price cannot be negative".to_string(),
                message_fr: "Le prix unitaire ne peut pas être négatif".to_string(),
            });
        }

        let result = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, description, unit_price, unit, barcode, min_stock_level, expiration_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#,
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.unit_price)
        .bind(input.unit)
        .bind(&input.barcode)
        .bind(input.min_stock_level.unwrap_or(10))
        .bind(input.expiration_date)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(product) => Ok(product),
            Err(err) => {
                let app_err = AppError::from(err);
                if app_err.is_unique_violation() {
                    Err(AppError::DuplicateEntry("barcode".to_string()))
                } else {
                    Err(app_err)
                }
            }
        }
    }

    /// Update catalog fields; never touches `stock_quantity`
    pub async fn update(&self, product_id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                unit_price = COALESCE($4, unit_price),
                unit = COALESCE($5, unit),
                barcode = COALESCE($6, barcode),
                min_stock_level = COALESCE($7, min_stock_level),
                expiration_date = COALESCE($8, expiration_date),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#,
        ))
        .bind(product_id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.unit_price)
        .bind(input.unit)
        .bind(input.barcode)
        .bind(input.min_stock_level)
        .bind(input.expiration_date)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product)
    }

    pub async fn get(&self, product_id: Uuid) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1",
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product)
    }

    /// List products, active only by default
    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1 OR is_active = TRUE) \
             ORDER BY name",
        ))
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }
}
