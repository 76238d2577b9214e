//! Per-owner holding statements.
//!
//! A statement lists every day of the requested period in the warehouse's
//! local time. Days with stock movements get one row per movement; quiet days
//! get a single blank row so the statement reads as a calendar.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockreloc_core::{DomainError, DomainResult, OwnerId};

/// Statement rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementSettings {
    /// Offset of the warehouse's local time from UTC.
    pub utc_offset_hours: i32,
    /// References containing this marker are receipts.
    pub receiving_marker: String,
}

impl Default for StatementSettings {
    fn default() -> Self {
        Self {
            utc_offset_hours: 8,
            receiving_marker: "RR".to_string(),
        }
    }
}

impl StatementSettings {
    fn offset(&self) -> DomainResult<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                DomainError::validation(format!("invalid UTC offset: {} hours", self.utc_offset_hours))
            })
    }

    pub fn classify(&self, reference: &str) -> MovementKind {
        if reference.contains(&self.receiving_marker) {
            MovementKind::Receiving
        } else {
            MovementKind::Withdrawal
        }
    }
}

/// A completed stock movement for one owner. Quantities are magnitudes; the
/// reference decides the direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub owner: OwnerId,
    pub timestamp: DateTime<Utc>,
    pub reference: String,
    #[serde(default)]
    pub product: Option<String>,
    pub pallets: Decimal,
    pub kilos: Decimal,
    /// The owner's contracted rates at the time of the movement.
    #[serde(default)]
    pub holding_rate: Decimal,
    #[serde(default)]
    pub handling_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Receiving,
    Withdrawal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRow {
    pub date: NaiveDate,
    /// `None` on blank days.
    pub reference: Option<String>,
    pub product: Option<String>,
    pub kind: Option<MovementKind>,
    pub pallets_in: Decimal,
    pub kilos_in: Decimal,
    pub pallets_out: Decimal,
    pub kilos_out: Decimal,
    /// Pallets held after this row.
    pub pallet_balance: Decimal,
    /// Kilos held after this row.
    pub kilo_balance: Decimal,
    /// Zero on blank days.
    pub holding_rate: Decimal,
    pub handling_rate: Decimal,
}

impl StatementRow {
    fn blank(date: NaiveDate, pallet_balance: Decimal, kilo_balance: Decimal) -> Self {
        Self {
            date,
            reference: None,
            product: None,
            kind: None,
            pallets_in: Decimal::ZERO,
            kilos_in: Decimal::ZERO,
            pallets_out: Decimal::ZERO,
            kilos_out: Decimal::ZERO,
            pallet_balance,
            kilo_balance,
            holding_rate: Decimal::ZERO,
            handling_rate: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementTotals {
    pub pallets_received: Decimal,
    pub kilos_received: Decimal,
    pub pallets_withdrawn: Decimal,
    pub kilos_withdrawn: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingStatement {
    pub owner: OwnerId,
    /// `January 01, 2024 - January 31, 2024`
    pub period: String,
    pub opening_pallets: Decimal,
    pub opening_kilos: Decimal,
    pub rows: Vec<StatementRow>,
    pub totals: StatementTotals,
}

/// Builds `owner`'s statement for the local days `from..=to`.
///
/// Movements before `from` only contribute to the opening balance; movements
/// after `to` and other owners' movements are ignored.
pub fn holding_statement(
    owner: OwnerId,
    records: &[HoldingRecord],
    from: NaiveDate,
    to: NaiveDate,
    settings: &StatementSettings,
) -> DomainResult<HoldingStatement> {
    if from > to {
        return Err(DomainError::validation(format!(
            "statement period starts after it ends: {from} > {to}"
        )));
    }
    let offset = settings.offset()?;

    let mut own: Vec<(NaiveDate, &HoldingRecord)> = records
        .iter()
        .filter(|r| r.owner == owner)
        .map(|r| (r.timestamp.with_timezone(&offset).date_naive(), r))
        .collect();
    own.sort_by_key(|(_, r)| r.timestamp);

    let mut pallets = Decimal::ZERO;
    let mut kilos = Decimal::ZERO;
    for (_, record) in own.iter().filter(|(day, _)| *day < from) {
        match settings.classify(&record.reference) {
            MovementKind::Receiving => {
                pallets += record.pallets;
                kilos += record.kilos;
            }
            MovementKind::Withdrawal => {
                pallets -= record.pallets;
                kilos -= record.kilos;
            }
        }
    }
    let (opening_pallets, opening_kilos) = (pallets, kilos);

    let mut rows = Vec::new();
    let mut totals = StatementTotals::default();
    for day in from.iter_days().take_while(|d| *d <= to) {
        let mut any = false;
        for (_, record) in own.iter().filter(|(d, _)| *d == day) {
            any = true;
            let kind = settings.classify(&record.reference);
            let mut row = StatementRow::blank(day, pallets, kilos);
            row.reference = Some(record.reference.clone());
            row.product = record.product.clone();
            row.kind = Some(kind);
            row.holding_rate = record.holding_rate;
            row.handling_rate = record.handling_rate;
            match kind {
                MovementKind::Receiving => {
                    row.pallets_in = record.pallets;
                    row.kilos_in = record.kilos;
                    totals.pallets_received += record.pallets;
                    totals.kilos_received += record.kilos;
                    pallets += record.pallets;
                    kilos += record.kilos;
                }
                MovementKind::Withdrawal => {
                    row.pallets_out = record.pallets;
                    row.kilos_out = record.kilos;
                    totals.pallets_withdrawn += record.pallets;
                    totals.kilos_withdrawn += record.kilos;
                    pallets -= record.pallets;
                    kilos -= record.kilos;
                }
            }
            row.pallet_balance = pallets;
            row.kilo_balance = kilos;
            rows.push(row);
        }
        if !any {
            rows.push(StatementRow::blank(day, pallets, kilos));
        }
    }

    tracing::debug!(
        owner = %owner,
        %from,
        %to,
        rows = rows.len(),
        "holding statement built"
    );
    Ok(HoldingStatement {
        owner,
        period: format!("{} - {}", from.format("%B %d, %Y"), to.format("%B %d, %Y")),
        opening_pallets,
        opening_kilos,
        rows,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    const ACME: OwnerId = OwnerId::from_u128(1);
    const OTHER: OwnerId = OwnerId::from_u128(2);

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(owner: OwnerId, ts: DateTime<Utc>, reference: &str, pallets: Decimal, kilos: Decimal) -> HoldingRecord {
        HoldingRecord {
            owner,
            timestamp: ts,
            reference: reference.to_string(),
            product: Some("Pork Belly".to_string()),
            pallets,
            kilos,
            holding_rate: Decimal::ZERO,
            handling_rate: Decimal::ZERO,
        }
    }

    #[test]
    fn every_day_gets_a_row_and_movements_land_on_local_days() {
        let records = vec![
            // 20:00 UTC on the 1st is the 2nd in UTC+8.
            record(ACME, at(2024, 3, 1, 20), "WH/RR/0001", dec!(2), dec!(1800)),
            record(ACME, at(2024, 3, 2, 3), "WH/DR/0004", dec!(1), dec!(900)),
            record(OTHER, at(2024, 3, 2, 3), "WH/RR/0002", dec!(5), dec!(5000)),
        ];
        let statement =
            holding_statement(ACME, &records, day(2024, 3, 1), day(2024, 3, 3), &StatementSettings::default()).unwrap();

        assert_eq!(statement.period, "March 01, 2024 - March 03, 2024");
        let shape: Vec<_> = statement.rows.iter().map(|r| (r.date, r.kind)).collect();
        assert_eq!(
            shape,
            vec![
                (day(2024, 3, 1), None),
                (day(2024, 3, 2), Some(MovementKind::Receiving)),
                (day(2024, 3, 2), Some(MovementKind::Withdrawal)),
                (day(2024, 3, 3), None),
            ]
        );
        assert_eq!(statement.rows[3].pallet_balance, dec!(1));
        assert_eq!(statement.rows[3].kilo_balance, dec!(900));
        assert_eq!(
            statement.totals,
            StatementTotals {
                pallets_received: dec!(2),
                kilos_received: dec!(1800),
                pallets_withdrawn: dec!(1),
                kilos_withdrawn: dec!(900),
            }
        );
    }

    #[test]
    fn earlier_movements_only_feed_the_opening_balance() {
        let records = vec![
            record(ACME, at(2024, 2, 10, 1), "WH/RR/0001", dec!(4), dec!(4000)),
            record(ACME, at(2024, 2, 20, 1), "WH/DR/0001", dec!(1), dec!(1000)),
            record(ACME, at(2024, 3, 5, 1), "WH/RR/0002", dec!(1), dec!(500)),
        ];
        let statement =
            holding_statement(ACME, &records, day(2024, 3, 1), day(2024, 3, 2), &StatementSettings::default()).unwrap();
        assert_eq!(statement.opening_pallets, dec!(3));
        assert_eq!(statement.opening_kilos, dec!(3000));
        assert_eq!(statement.rows.len(), 2);
        assert!(statement.rows.iter().all(|r| r.kind.is_none() && r.pallet_balance == dec!(3)));
        assert_eq!(statement.totals, StatementTotals::default());
    }

    #[test]
    fn movement_rows_carry_the_owner_rates() {
        let mut receipt = record(ACME, at(2024, 3, 1, 1), "WH/RR/0001", dec!(2), dec!(1800));
        receipt.holding_rate = dec!(45.50);
        receipt.handling_rate = dec!(120);
        let statement = holding_statement(
            ACME,
            &[receipt],
            day(2024, 3, 1),
            day(2024, 3, 2),
            &StatementSettings::default(),
        )
        .unwrap();
        assert_eq!(statement.rows[0].holding_rate, dec!(45.50));
        assert_eq!(statement.rows[0].handling_rate, dec!(120));
        assert_eq!(statement.rows[1].holding_rate, Decimal::ZERO);
        assert_eq!(statement.rows[1].handling_rate, Decimal::ZERO);

        let json = r#"{"owner":"00000000-0000-0000-0000-000000000001","timestamp":"2024-03-01T01:00:00Z",
            "reference":"WH/DR/1","pallets":"1","kilos":"10"}"#;
        let parsed: HoldingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.holding_rate, Decimal::ZERO);
    }

    #[test]
    fn custom_marker_and_offset() {
        let settings = StatementSettings {
            utc_offset_hours: 0,
            receiving_marker: "IN/".to_string(),
        };
        let records = vec![record(ACME, at(2024, 3, 1, 20), "WH/IN/7", dec!(1), dec!(10))];
        let statement = holding_statement(ACME, &records, day(2024, 3, 1), day(2024, 3, 1), &settings).unwrap();
        assert_eq!(statement.rows.len(), 1);
        assert_eq!(statement.rows[0].kind, Some(MovementKind::Receiving));
    }

    #[test]
    fn inverted_period_and_bad_offset_are_rejected() {
        let settings = StatementSettings::default();
        let err = holding_statement(ACME, &[], day(2024, 3, 2), day(2024, 3, 1), &settings).unwrap_err();
        assert!(err.is_validation());

        let bad = StatementSettings {
            utc_offset_hours: 30,
            ..StatementSettings::default()
        };
        assert!(holding_statement(ACME, &[], day(2024, 3, 1), day(2024, 3, 1), &bad).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: closing balance = opening + received - withdrawn.
        #[test]
        fn balance_reconciles_with_totals(
            moves in prop::collection::vec((0u32..60, any::<bool>(), 0i64..10, 0i64..10_000), 0..30),
        ) {
            let records: Vec<_> = moves
                .iter()
                .map(|(hours, receiving, pallets, kilos)| {
                    let reference = if *receiving { "WH/RR/1" } else { "WH/DR/1" };
                    record(
                        ACME,
                        at(2024, 3, 1, 0) + chrono::Duration::hours(i64::from(*hours) * 12),
                        reference,
                        Decimal::from(*pallets),
                        Decimal::from(*kilos),
                    )
                })
                .collect();
            let statement = holding_statement(
                ACME,
                &records,
                day(2024, 3, 5),
                day(2024, 3, 20),
                &StatementSettings::default(),
            )
            .unwrap();

            let days = statement.rows.iter().map(|r| r.date).collect::<std::collections::BTreeSet<_>>();
            prop_assert_eq!(days.len(), 16);
            let last = statement.rows.last().unwrap();
            prop_assert_eq!(
                last.pallet_balance,
                statement.opening_pallets + statement.totals.pallets_received - statement.totals.pallets_withdrawn
            );
            prop_assert_eq!(
                last.kilo_balance,
                statement.opening_kilos + statement.totals.kilos_received - statement.totals.kilos_withdrawn
            );
        }
    }
}
