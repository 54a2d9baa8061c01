//! Keyword classification of chat questions
//!
//! Shared by the keyword synthesizer and the template composer so that a
//! question's SQL and its canned answer always agree.

use crate::db::QueryParam;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PLATFORM_ID: Regex = Regex::new(r"\b(\d{7})\b").unwrap();
    static ref YEAR: Regex = Regex::new(r"\b((?:19|20)\d{2})\b").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionIntent {
    AllFloats,
    LatestLocation { platform_id: String },
    AverageTemperature { platform_id: String },
    MeasurementsInYear { year: i64 },
    AtlanticFloats,
    TemperatureRange,
    HighestSalinity,
    PacificFloats,
    DeepestPressure,
    MonthlyAverages { platform_id: String },
    Unmatched,
}

pub const DEFAULT_SQL: &str = "SELECT platform_id, measurement_date, temperature_celsius, salinity_psu \
     FROM floats ORDER BY platform_id, measurement_date LIMIT 10";

impl QuestionIntent {
    /// First matching rule wins; rule order matters.
    pub fn classify(question: &str) -> Self {
        let q = question.to_lowercase();
        let platform_id = PLATFORM_ID.captures(&q).map(|c| c[1].to_string());

        if q.contains("all available floats") || q.contains("show me all floats") {
            return QuestionIntent::AllFloats;
        }
        if let Some(id) = platform_id.as_ref().filter(|_| q.contains("latest location")) {
            return QuestionIntent::LatestLocation { platform_id: id.clone() };
        }
        if let Some(id) = platform_id.as_ref().filter(|_| q.contains("average temperature")) {
            return QuestionIntent::AverageTemperature { platform_id: id.clone() };
        }
        if let Some(year) = YEAR.captures(&q).and_then(|c| c[1].parse().ok()) {
            return QuestionIntent::MeasurementsInYear { year };
        }
        if q.contains("atlantic ocean") {
            return QuestionIntent::AtlanticFloats;
        }
        if q.contains("temperature range") {
            return QuestionIntent::TemperatureRange;
        }
        if q.contains("highest salinity") {
            return QuestionIntent::HighestSalinity;
        }
        if q.contains("pacific ocean") {
            return QuestionIntent::PacificFloats;
        }
        if q.contains("deepest pressure") {
            return QuestionIntent::DeepestPressure;
        }
        if let Some(id) = platform_id.filter(|_| q.contains("monthly averages")) {
            return QuestionIntent::MonthlyAverages { platform_id: id };
        }
        QuestionIntent::Unmatched
    }

    /// SQL template and bound parameters for this intent.
    pub fn query(&self) -> (&'static str, Vec<QueryParam>) {
        match self {
            QuestionIntent::AllFloats => (
                "SELECT DISTINCT platform_id FROM floats ORDER BY platform_id",
                vec![],
            ),
            QuestionIntent::LatestLocation { platform_id } => (
                "SELECT platform_id, latitude, longitude FROM floats WHERE platform_id = $1 \
                 ORDER BY measurement_date DESC LIMIT 1",
                vec![QueryParam::from(platform_id.as_str())],
            ),
            QuestionIntent::AverageTemperature { platform_id } => (
                "SELECT AVG(temperature_celsius) AS avg_temp FROM floats WHERE platform_id = $1 \
                 AND temperature_celsius IS NOT NULL",
                vec![QueryParam::from(platform_id.as_str())],
            ),
            QuestionIntent::MeasurementsInYear { year } => (
                "SELECT platform_id, measurement_date, temperature_celsius, salinity_psu FROM floats \
                 WHERE EXTRACT(YEAR FROM measurement_date) = $1 ORDER BY measurement_date LIMIT 10",
                vec![QueryParam::Integer(*year)],
            ),
            QuestionIntent::AtlanticFloats => (
                "SELECT DISTINCT platform_id FROM floats WHERE longitude BETWEEN -80 AND -20 \
                 AND latitude BETWEEN 0 AND 60 ORDER BY platform_id LIMIT 10",
                vec![],
            ),
            QuestionIntent::TemperatureRange => (
                "SELECT MIN(temperature_celsius) AS min_temp, MAX(temperature_celsius) AS max_temp, \
                 AVG(temperature_celsius) AS avg_temp FROM floats WHERE temperature_celsius IS NOT NULL",
                vec![],
            ),
            QuestionIntent::HighestSalinity => (
                "SELECT platform_id, MAX(salinity_psu) AS max_salinity FROM floats \
                 WHERE salinity_psu IS NOT NULL GROUP BY platform_id ORDER BY max_salinity DESC LIMIT 5",
                vec![],
            ),
            QuestionIntent::PacificFloats => (
                "SELECT DISTINCT platform_id FROM floats WHERE (longitude >= 120 OR longitude <= -120) \
                 AND latitude BETWEEN -60 AND 60 ORDER BY platform_id LIMIT 10",
                vec![],
            ),
            QuestionIntent::DeepestPressure => (
                "SELECT platform_id, MAX(pressure_dbar) AS max_pressure FROM floats \
                 WHERE pressure_dbar IS NOT NULL GROUP BY platform_id ORDER BY max_pressure DESC LIMIT 5",
                vec![],
            ),
            QuestionIntent::MonthlyAverages { platform_id } => (
                "SELECT DATE_TRUNC('month', measurement_date) AS month, AVG(temperature_celsius) AS avg_temp, \
                 AVG(salinity_psu) AS avg_salinity FROM floats WHERE platform_id = $1 \
                 GROUP BY month ORDER BY month",
                vec![QueryParam::from(platform_id.as_str())],
            ),
            QuestionIntent::Unmatched => (DEFAULT_SQL, vec![]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::prompts::SAMPLE_QUERIES;

    #[test]
    fn test_sample_queries_all_classify() {
        for sample in SAMPLE_QUERIES {
            assert_ne!(QuestionIntent::classify(sample), QuestionIntent::Unmatched, "{}", sample);
        }
    }

    #[test]
    fn test_platform_id_is_extracted() {
        assert_eq!(
            QuestionIntent::classify("What's the latest location of float 1901740?"),
            QuestionIntent::LatestLocation { platform_id: "1901740".to_string() }
        );
        // without an id the rule does not apply
        assert_eq!(
            QuestionIntent::classify("What's the latest location?"),
            QuestionIntent::Unmatched
        );
    }

    #[test]
    fn test_year_rule_precedes_region_rules() {
        assert_eq!(
            QuestionIntent::classify("Atlantic Ocean floats in 2021"),
            QuestionIntent::MeasurementsInYear { year: 2021 }
        );
        // a platform id is not mistaken for a year
        assert_eq!(
            QuestionIntent::classify("Show me monthly averages for float 1900816"),
            QuestionIntent::MonthlyAverages { platform_id: "1900816".to_string() }
        );
    }

    #[test]
    fn test_parameters_are_bound_not_spliced() {
        let (sql, params) = QuestionIntent::AverageTemperature { platform_id: "1900816".into() }.query();
        assert!(!sql.contains("1900816"));
        assert_eq!(params, vec![QueryParam::Text("1900816".to_string())]);
    }

    #[test]
    fn test_all_templates_pass_the_guard() {
        let guard = crate::security::QueryGuard::default();
        for sample in SAMPLE_QUERIES.iter().chain(["nothing relevant"].iter()) {
            let (sql, _) = QuestionIntent::classify(sample).query();
            assert!(guard.check(sql).is_ok(), "{}", sql);
        }
    }
}
