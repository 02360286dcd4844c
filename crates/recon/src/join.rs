use std::collections::HashMap;

use crate::config::JoinKey;
use crate::error::ReconError;
use crate::model::{MergedRecord, PreparedSource, QuotationRecord, Source};

fn key_of(record: &QuotationRecord, key: JoinKey) -> String {
    match key {
        JoinKey::QuotationId => record.quotation_id.trim().to_string(),
        JoinKey::Id => record.id.to_string(),
    }
}

/// Index one side by join key. Duplicate non-empty keys break the
/// one-row-per-request guarantee and are rejected.
fn index_unique(
    prepared: &PreparedSource,
    key: JoinKey,
) -> Result<HashMap<String, &QuotationRecord>, ReconError> {
    let mut index = HashMap::with_capacity(prepared.records.len());
    for record in &prepared.records {
        let k = key_of(record, key);
        if k.is_empty() {
            continue;
        }
        if index.insert(k.clone(), record).is_some() {
            return Err(ReconError::DuplicateKey {
                source: prepared.source,
                key: k,
            });
        }
    }
    Ok(index)
}

/// Left outer join request ⟕ deal specialist ⟕ pricing engine.
///
/// Output has exactly one entry per request record, in request order.
/// Request rows with an empty key never match.
pub fn join(
    request: &PreparedSource,
    deal_specialist: &PreparedSource,
    pricing_engine: &PreparedSource,
    key: JoinKey,
) -> Result<Vec<MergedRecord>, ReconError> {
    index_unique(request, key)?;
    let ds_index = index_unique(deal_specialist, key)?;
    let pe_index = index_unique(pricing_engine, key)?;

    let merged: Vec<MergedRecord> = request
        .records
        .iter()
        .map(|req| {
            let k = key_of(req, key);
            let lookup = |index: &HashMap<String, &QuotationRecord>| {
                if k.is_empty() {
                    None
                } else {
                    index.get(&k).map(|r| (*r).clone())
                }
            };
            MergedRecord {
                request: req.clone(),
                deal_specialist: lookup(&ds_index),
                pricing_engine: lookup(&pe_index),
            }
        })
        .collect();

    let matched = |s: Source| merged.iter().filter(|m| m.side(s).is_some()).count();
    log::info!(
        "joined {} request rows: {} deal-specialist matches, {} pricing-engine matches",
        merged.len(),
        matched(Source::DealSpecialist),
        matched(Source::PricingEngine),
    );

    Ok(merged)
}
