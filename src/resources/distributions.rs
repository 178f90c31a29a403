//! Survey distributions

use super::Qualtrics;
use crate::client::{Record, Transport};
use crate::error::Result;
use crate::models::{SurveyId, fields};

impl<T: Transport> Qualtrics<T> {
    /// Every distribution of a survey.
    pub async fn list_distributions(&self, survey: &SurveyId) -> Result<Vec<Record>> {
        self.list(
            "distributions",
            &[("surveyId", survey.as_str())],
            fields::DISTRIBUTIONS,
        )
        .await
    }
}
