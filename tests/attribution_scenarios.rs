// tests/attribution_scenarios.rs
// Broadcast-shaped scenarios for the decay model + attribution engine.

use chrono::{DateTime, Duration, TimeZone, Utc};
use live_event_attribution::{
    attribute, decay_weight, AdBreakRegistry, ConversionEvent, DecayParams,
};

fn on_air() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 31, 20, 14, 0).unwrap()
}

fn at_minute(min: i64, value: f64) -> ConversionEvent {
    ConversionEvent::new(on_air() + Duration::minutes(min), value)
}

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn single_ad_decay_table() {
    let mut reg = AdBreakRegistry::new();
    reg.add(on_air(), "WWE_Title_Promo");
    let params = DecayParams::default();

    let minutes = [0, 3, 6, 30, 31];
    let batch: Vec<_> = minutes.iter().map(|&m| at_minute(m, 100.0)).collect();
    let results = attribute(&batch, &reg, &params).unwrap();

    // raw influence: 2^(-elapsed/6) * value
    let raw: Vec<f64> = batch
        .iter()
        .map(|c| decay_weight(c.timestamp, on_air(), &params) * c.value)
        .collect();
    assert!(close(raw[0], 100.0, 1e-12));
    assert!(close(raw[1], 70.71, 0.01));
    assert!(close(raw[2], 50.0, 1e-9));
    assert!(close(raw[3], 3.125, 1e-9));
    assert_eq!(raw[4], 0.0);

    // a lone eligible source takes the whole value after normalization
    for r in &results[..4] {
        assert!(r.is_incremental());
        assert!(close(r.campaign_share("WWE_Title_Promo"), 100.0, 1e-9));
    }
    assert!(!results[4].is_incremental());
    assert_eq!(results[4].organic(), Some(100.0));
}

#[test]
fn overlapping_ads_split_by_decayed_weight() {
    let mut reg = AdBreakRegistry::new();
    reg.add(on_air(), "WWE_Title_Promo")
        .add(on_air() + Duration::minutes(3), "Royal_Rumble_Ads");

    let results = attribute(&[at_minute(3, 100.0)], &reg, &DecayParams::default()).unwrap();
    let r = &results[0];

    let w_old = 2f64.powf(-0.5);
    let w_new = 1.0;
    let expect_old = 100.0 * w_old / (w_old + w_new);

    assert!(close(r.campaign_share("WWE_Title_Promo"), expect_old, 1e-9));
    assert!(close(r.campaign_share("Royal_Rumble_Ads"), 100.0 - expect_old, 1e-9));
    assert!(close(r.attributed_total(), 100.0, 1e-9));
}

#[test]
fn empty_registry_is_all_organic() {
    let reg = AdBreakRegistry::new();
    let batch: Vec<_> = (0..10).map(|m| at_minute(m, 12.5 * m as f64)).collect();
    for (c, r) in batch.iter().zip(attribute(&batch, &reg, &DecayParams::default()).unwrap()) {
        assert!(!r.is_incremental());
        assert_eq!(r.organic(), Some(c.value));
        assert!(r.per_campaign().is_none());
    }
}

#[test]
fn boundary_instants() {
    let mut reg = AdBreakRegistry::new();
    reg.add(on_air(), "Promo");
    let p = DecayParams::default();
    let edge = on_air() + Duration::minutes(30);

    let batch = [
        ConversionEvent::new(on_air(), 1.0),
        ConversionEvent::new(edge, 1.0),
        ConversionEvent::new(edge + Duration::milliseconds(1), 1.0),
        ConversionEvent::new(on_air() - Duration::milliseconds(1), 1.0),
    ];
    let out = attribute(&batch, &reg, &p).unwrap();
    assert!(out[0].is_incremental());
    assert!(out[1].is_incremental());
    assert!(!out[2].is_incremental());
    assert!(!out[3].is_incremental());

    assert_eq!(decay_weight(on_air(), on_air(), &p), 1.0);
    assert!(decay_weight(edge, on_air(), &p) > 0.0);
}

#[test]
fn conservation_and_exclusivity_over_a_busy_hour() {
    let start = on_air() - Duration::minutes(14);
    let mut reg = AdBreakRegistry::new();
    for (m, name) in [(14, "A"), (20, "B"), (22, "A"), (42, "C"), (50, "D")] {
        reg.add(start + Duration::minutes(m), name);
    }

    let batch: Vec<_> = (0..3600)
        .step_by(7)
        .map(|s| ConversionEvent::new(start + Duration::seconds(s), 1.0 + (s % 97) as f64))
        .collect();
    let results = attribute(&batch, &reg, &DecayParams::default()).unwrap();
    assert_eq!(results.len(), batch.len());

    for (c, r) in batch.iter().zip(&results) {
        assert_eq!(r.conversion, *c, "order must be preserved");
        let tol = 1e-9 * c.value.max(1.0);
        assert!(
            close(r.attributed_total(), c.value, tol),
            "lost value at {}: {} vs {}",
            c.timestamp,
            r.attributed_total(),
            c.value
        );
        match (r.per_campaign(), r.organic()) {
            (Some(shares), None) => {
                assert!(!shares.is_empty());
                assert!(r.is_incremental());
            }
            (None, Some(_)) => assert!(!r.is_incremental()),
            other => panic!("both or neither bucket populated: {other:?}"),
        }
    }
}

#[test]
fn custom_half_life_changes_the_split() {
    let mut reg = AdBreakRegistry::new();
    reg.add(on_air(), "Old").add(on_air() + Duration::minutes(10), "New");
    let conv = [at_minute(10, 100.0)];

    let slow = attribute(&conv, &reg, &DecayParams::new(30.0, 20.0).unwrap()).unwrap();
    let fast = attribute(&conv, &reg, &DecayParams::new(30.0, 2.0).unwrap()).unwrap();

    // a longer half-life keeps the earlier ad relevant for longer
    assert!(slow[0].campaign_share("Old") > fast[0].campaign_share("Old"));
    assert!(close(slow[0].campaign_share("Old"), 100.0 * 0.5f64.sqrt() / (0.5f64.sqrt() + 1.0), 1e-9));
}
