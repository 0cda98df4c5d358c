// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mock PIX charges.
//!
//! No money moves. A charge produces a BR Code (EMV QR "copia e cola")
//! payload so the UI can render a believable QR code; its transaction id is
//! the identity gate attempt id.
//!
//! Every EMV field length is two digits, so values are cut to fit in bytes,
//! never in characters.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

const PIX_GUI: &str = "br.gov.bcb.pix";
const CURRENCY_BRL: &str = "986";
const COUNTRY_BR: &str = "BR";
const MAX_DESCRIPTION: usize = 40;
const MAX_MERCHANT_NAME: usize = 25;
const MAX_MERCHANT_CITY: usize = 15;
const MAX_PIX_KEY: usize = 77;
const MAX_TXID: usize = 25;
const MAX_FIELD: usize = 99;
const MAX_AMOUNT_CHARS: usize = 13;

/// A pending mock PIX charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PixCharge {
    pub transaction_id: String,
    pub amount: f64,
    pub description: String,
    /// BR Code payload to render as a QR code.
    pub qr_code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PixError {
    #[error("amount must be a positive number of at most 10 integer digits")]
    InvalidAmount,
}

/// Issues mock PIX charges for a single receiving key.
#[derive(Debug, Clone)]
pub struct PixMockGateway {
    pix_key: String,
    merchant_name: String,
    merchant_city: String,
    charge_ttl: Duration,
}

impl PixMockGateway {
    pub fn new(
        pix_key: impl Into<String>,
        merchant_name: impl Into<String>,
        merchant_city: impl Into<String>,
        charge_ttl: Duration,
    ) -> Self {
        Self {
            pix_key: truncate_bytes(&pix_key.into(), MAX_PIX_KEY).to_string(),
            merchant_name: truncate_bytes(&merchant_name.into(), MAX_MERCHANT_NAME).to_string(),
            merchant_city: truncate_bytes(&merchant_city.into(), MAX_MERCHANT_CITY).to_string(),
            charge_ttl,
        }
    }

    /// Create a charge and its BR Code payload.
    pub fn create_charge(&self, amount: f64, description: &str) -> Result<PixCharge, PixError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(PixError::InvalidAmount);
        }
        let amount_field = format!("{amount:.2}");
        if amount_field.len() > MAX_AMOUNT_CHARS {
            return Err(PixError::InvalidAmount);
        }

        let transaction_id = Uuid::new_v4().to_string();
        let description = truncate(description.trim(), MAX_DESCRIPTION);
        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::from_std(self.charge_ttl).unwrap_or(chrono::Duration::zero());

        let qr_code = self.br_code(&transaction_id, &amount_field, &description);

        Ok(PixCharge {
            transaction_id,
            amount,
            description,
            qr_code,
            created_at,
            expires_at,
        })
    }

    fn br_code(&self, transaction_id: &str, amount: &str, description: &str) -> String {
        let mut account = emv_field("00", PIX_GUI);
        account.push_str(&emv_field("01", &self.pix_key));
        // field 26 as a whole must stay within two length digits
        let room = MAX_FIELD.saturating_sub(account.len() + 4);
        let description = truncate_bytes(description, room);
        if !description.is_empty() {
            account.push_str(&emv_field("02", description));
        }

        let txid: String = transaction_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(MAX_TXID)
            .collect();

        let mut payload = String::new();
        payload.push_str(&emv_field("00", "01"));
        payload.push_str(&emv_field("26", &account));
        payload.push_str(&emv_field("52", "0000"));
        payload.push_str(&emv_field("53", CURRENCY_BRL));
        payload.push_str(&emv_field("54", amount));
        payload.push_str(&emv_field("58", COUNTRY_BR));
        payload.push_str(&emv_field("59", &self.merchant_name));
        payload.push_str(&emv_field("60", &self.merchant_city));
        payload.push_str(&emv_field("62", &emv_field("05", &txid)));
        payload.push_str("6304");

        let crc = crc16_ccitt(payload.as_bytes());
        payload.push_str(&format!("{crc:04X}"));
        payload
    }
}

impl Default for PixMockGateway {
    fn default() -> Self {
        Self::new(
            "privacy@sealed-requests.example",
            "Sealed Requests",
            "Sao Paulo",
            Duration::from_secs(15 * 60),
        )
    }
}

fn emv_field(id: &str, value: &str) -> String {
    format!("{id}{:02}{value}", value.len())
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Longest prefix of `value` that fits in `max` bytes.
fn truncate_bytes(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// CRC-16/CCITT-FALSE, as required for the BR Code `63` field.
fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
