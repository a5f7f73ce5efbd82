//! # Processor Registry
//!
//! Static lookup from a processor kind (as written in the source table) to a
//! shared processor instance.

use std::sync::Arc;

use super::chess::ChessProcessor;
use super::climbing::ClimbingProcessor;
use super::cod::CodProcessor;
use super::dobble::DobbleProcessor;
use super::driving::DrivingProcessor;
use super::duolingo::DuolingoProcessor;
use super::five_k::FiveKProcessor;
use super::parkrun::ParkrunProcessor;
use super::processor::SourceProcessor;
use super::spotify::SpotifyProcessor;
use super::strength::StrengthProcessor;
use super::typing::TypingProcessor;

/// Every kind [`processor_for`] understands.
pub const KNOWN_KINDS: &[&str] = &[
    "five_k", "parkrun", "driving", "spotify", "chess", "duolingo", "climbing", "cod", "dobble", "typing",
    "pullups", "pushups",
];

/// Looks up the processor for `kind`. Returns `None` for unknown kinds.
pub fn processor_for(kind: &str) -> Option<Arc<dyn SourceProcessor>> {
    let processor: Arc<dyn SourceProcessor> = match kind {
        "five_k" => Arc::new(FiveKProcessor),
        "parkrun" => Arc::new(ParkrunProcessor),
        "driving" => Arc::new(DrivingProcessor::default()),
        "spotify" => Arc::new(SpotifyProcessor),
        "chess" => Arc::new(ChessProcessor),
        "duolingo" => Arc::new(DuolingoProcessor),
        "climbing" => Arc::new(ClimbingProcessor),
        "cod" => Arc::new(CodProcessor),
        "dobble" => Arc::new(DobbleProcessor),
        "typing" => Arc::new(TypingProcessor),
        "pullups" => Arc::new(StrengthProcessor::pullups()),
        "pushups" => Arc::new(StrengthProcessor::pushups()),
        _ => return None,
    };
    Some(processor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::processor::test_support::*;
    use crate::tabular::RawTable;

    #[test]
    fn every_known_kind_resolves_to_itself() {
        for kind in KNOWN_KINDS {
            let p = processor_for(kind).unwrap_or_else(|| panic!("no processor for {}", kind));
            assert_eq!(p.kind(), *kind);
        }
    }

    #[test]
    fn unknown_kind_is_none() {
        assert!(processor_for("knitting").is_none());
    }

    #[test]
    fn every_processor_accepts_its_own_header_only_table() {
        for kind in KNOWN_KINDS {
            let p = processor_for(kind).unwrap();
            let header: Vec<String> = p.required_columns().iter().map(|c| c.to_string()).collect();
            let table = RawTable::from_grid(vec![header.clone()]);
            p.validate_header(&table).unwrap();

            let header_refs: Vec<&str> = header.iter().map(String::as_str).collect();
            let out = p.process(&records(&[header_refs.as_slice()]), &ctx());
            assert!(out.is_ok(), "{} failed on header-only input: {:?}", kind, out.as_ref().err());
            assert!(out.unwrap().is_object());
        }
    }
}
