//! Property-based tests for naming and identity invariants.
//!
//! Tests validate:
//! 1. Container ids reject empty and whitespace-bearing input
//! 2. Event names depend only on kind and id
//! 3. Kind inference honours a valid discriminator over the id
//! 4. Root margin shorthand expands to four sides

use loadmore::model::{ContainerId, ContainerKind, EventName, MarginLength, RootMargin};
use loadmore::model::event_name::RESULTS_EVENT;
use proptest::prelude::*;

// ===== Property 1: Identifier Constructor =====

proptest! {
    #[test]
    fn container_id_rejects_whitespace(a in "[a-z]{0,8}", b in "[a-z]{0,8}", ws in "[ \t\n]") {
        let raw = format!("{a}{ws}{b}");
        prop_assert!(ContainerId::new(raw).is_err());
    }

    #[test]
    fn container_id_accepts_visible_ascii(s in "[!-~]{1,40}") {
        let id = ContainerId::new(s.clone());
        prop_assert!(id.is_ok());
        let id = id.unwrap();
        prop_assert_eq!(id.as_str(), s.as_str());
    }
}

#[test]
fn container_id_rejects_empty_string() {
    assert!(ContainerId::new("").is_err());
}

// ===== Property 2: Event Name Derivation =====

proptest! {
    #[test]
    fn filter_event_strips_container_suffix(stem in "[a-z_]{1,20}") {
        let id = ContainerId::new(format!("{stem}-container")).unwrap();
        let event = EventName::for_container(ContainerKind::FilterList, &id);
        prop_assert_eq!(event.as_str(), format!("load_more_{stem}"));
    }

    #[test]
    fn filter_event_without_suffix_uses_whole_id(raw in "[a-z]{1,12}(-[a-z]{1,6})?") {
        prop_assume!(!raw.ends_with("-container"));
        let id = ContainerId::new(raw.clone()).unwrap();
        let event = EventName::for_container(ContainerKind::FilterList, &id);
        prop_assert_eq!(event.as_str(), format!("load_more_{raw}"));
    }

    #[test]
    fn result_stream_event_is_constant(raw in "[a-z_-]{1,30}") {
        let id = ContainerId::new(raw).unwrap();
        let event = EventName::for_container(ContainerKind::ResultStream, &id);
        prop_assert_eq!(event.as_str(), RESULTS_EVENT);
        prop_assert_eq!(
            event.as_str(),
            "Bonfire.PanDoRa.Web.SearchLive:load_more_search_results"
        );
    }

    #[test]
    fn event_name_is_deterministic(raw in "[a-z-]{1,30}") {
        let id = ContainerId::new(raw).unwrap();
        for kind in [ContainerKind::FilterList, ContainerKind::ResultStream] {
            prop_assert_eq!(
                EventName::for_container(kind, &id),
                EventName::for_container(kind, &id.clone())
            );
        }
    }
}

// ===== Property 3: Kind Inference =====

proptest! {
    #[test]
    fn discriminator_wins_over_id(raw in "[a-z_-]{1,30}") {
        let id = ContainerId::new(raw).unwrap();
        prop_assert_eq!(ContainerKind::infer(&id, Some("results")), ContainerKind::ResultStream);
        prop_assert_eq!(ContainerKind::infer(&id, Some("filter")), ContainerKind::FilterList);
    }

    #[test]
    fn unknown_discriminator_falls_back_to_id(raw in "[a-z-]{1,30}", junk in "[A-Z]{1,8}") {
        prop_assume!(raw != "search_results");
        let id = ContainerId::new(raw).unwrap();
        prop_assert_eq!(ContainerKind::infer(&id, Some(&junk)), ContainerKind::FilterList);
        prop_assert_eq!(ContainerKind::infer(&id, None), ContainerKind::FilterList);
    }
}

#[test]
fn results_id_infers_result_stream() {
    let id = ContainerId::new("search_results").unwrap();
    assert_eq!(ContainerKind::infer(&id, None), ContainerKind::ResultStream);
}

// ===== Property 4: Root Margin Shorthand =====

proptest! {
    #[test]
    fn single_length_applies_to_every_side(px in -500i32..500) {
        let margin: RootMargin = format!("{px}px").parse().unwrap();
        for side in [margin.top, margin.right, margin.bottom, margin.left] {
            prop_assert_eq!(side, MarginLength::Px(px));
        }
    }

    #[test]
    fn two_lengths_pair_vertical_and_horizontal(v in -500i32..500, h in 0i32..100) {
        let margin: RootMargin = format!("{v}px {h}%").parse().unwrap();
        prop_assert_eq!(margin.top, MarginLength::Px(v));
        prop_assert_eq!(margin.bottom, MarginLength::Px(v));
        prop_assert_eq!(margin.left, MarginLength::Percent(h));
        prop_assert_eq!(margin.right, MarginLength::Percent(h));
    }

    #[test]
    fn top_margin_display_parses_back(px in -500i32..500) {
        let margin = RootMargin::top_px(px);
        prop_assert_eq!(margin.to_string().parse::<RootMargin>().unwrap(), margin);
    }

    #[test]
    fn five_lengths_are_rejected(px in 0i32..50) {
        let raw = vec![format!("{px}px"); 5].join(" ");
        prop_assert!(raw.parse::<RootMargin>().is_err());
    }
}
