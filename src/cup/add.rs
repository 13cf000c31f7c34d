use crate::error::Result;
use crate::models::{
    ClassResult, Cup, CupScore, Organisation, PersonOrganisations, PersonRaceResult, PersonResult,
};

use super::CupTypeCalculationStrategy;

/// Cup type without scoring rules. Nothing is eligible and nothing scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddStrategy;

impl CupTypeCalculationStrategy for AddStrategy {
    fn name(&self) -> &'static str {
        "Add"
    }

    fn valid_class_result(&self, _class_result: &ClassResult) -> bool {
        false
    }

    fn valid_person_result(&self, _person_result: &PersonResult) -> bool {
        false
    }

    fn valid_organisation(&self, _organisation: &Organisation) -> Result<bool> {
        Ok(false)
    }

    fn calculate(
        &self,
        _cup: &Cup,
        _results: &[PersonRaceResult],
        _person_to_organisation: &PersonOrganisations,
    ) -> Result<Vec<CupScore>> {
        Ok(Vec::new())
    }
}
