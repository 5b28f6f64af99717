// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Form input validation. Nothing here touches the store; a form that fails
//! validation never reaches a gateway.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::models::{Category, Month, Record, RecordId};

/// Raw text of the add/edit record form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordForm {
    pub category: String,
    pub month: String,
    pub year: String,
    pub amount: String,
}

/// Validated record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInput {
    pub category: String,
    pub month: Month,
    pub year: String,
    pub amount: Decimal,
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(v)
}

pub fn validate_year(raw: &str) -> Result<String, ValidationError> {
    let year = required("year", raw)?;
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Invalid {
            field: "year",
            reason: format!("'{}' is not a 4-digit year", year),
        });
    }
    Ok(year.to_string())
}

pub fn validate_amount(raw: &str) -> Result<Decimal, ValidationError> {
    let amount = required("amount", raw)?;
    amount
        .parse::<Decimal>()
        .map_err(|err| ValidationError::Invalid {
            field: "amount",
            reason: format!("'{}': {}", amount, err),
        })
}

impl RecordForm {
    /// `known` is the current category list of the record's kind; the
    /// category must match one of them exactly.
    pub fn validate(&self, known: &[Category]) -> Result<RecordInput, ValidationError> {
        let category = required("category", &self.category)?;
        let month = required("month", &self.month)?;
        let year = validate_year(&self.year)?;
        let amount = validate_amount(&self.amount)?;

        let month = month
            .parse::<Month>()
            .map_err(|err| ValidationError::Invalid {
                field: "month",
                reason: err.to_string(),
            })?;
        if !known.iter().any(|c| c.name == category) {
            return Err(ValidationError::UnknownCategory(category.to_string()));
        }
        Ok(RecordInput {
            category: category.to_string(),
            month,
            year,
            amount,
        })
    }

    /// A new record with a fresh id and both timestamps set to now.
    pub fn build(&self, known: &[Category]) -> Result<Record, ValidationError> {
        let input = self.validate(known)?;
        let now = Utc::now();
        Ok(Record {
            id: RecordId::new(),
            category: input.category,
            month: input.month,
            year: input.year,
            amount: input.amount,
            created_at: now,
            updated_at: now,
        })
    }

    /// `existing` with the form's fields applied; id and creation time kept.
    pub fn apply_to(&self, existing: &Record, known: &[Category]) -> Result<Record, ValidationError> {
        let input = self.validate(known)?;
        Ok(Record {
            id: existing.id,
            category: input.category,
            month: input.month,
            year: input.year,
            amount: input.amount,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        })
    }
}

impl From<&Record> for RecordForm {
    fn from(r: &Record) -> Self {
        Self {
            category: r.category.clone(),
            month: r.month.label().to_string(),
            year: r.year.clone(),
            amount: r.amount.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryForm {
    pub name: String,
}

impl CategoryForm {
    pub fn validate(&self) -> Result<String, ValidationError> {
        Ok(required("category name", &self.name)?.to_string())
    }

    pub fn build(&self) -> Result<Category, ValidationError> {
        let name = self.validate()?;
        let now = Utc::now();
        Ok(Category {
            id: RecordId::new(),
            name,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_to(&self, existing: &Category) -> Result<Category, ValidationError> {
        Ok(Category {
            id: existing.id,
            name: self.validate()?,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        })
    }
}
