//! JSON reporter

use anyhow::Result;
use serde::Serialize;

/// Render as pretty-printed JSON
pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn render_compact<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::quality_summary;
    use crate::scoring::GradeBands;
    use crate::store::MemoryStore;

    #[test]
    fn test_summary_json_uses_camel_case() {
        let report = quality_summary(&MemoryStore::new(), &GradeBands::default()).unwrap();
        let json = render(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["summary"]["averageQualityScore"], 100.0);
        assert_eq!(parsed["summary"]["qualityGrade"], "A");
        assert!(parsed["flows"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_compact_is_one_line() {
        let report = quality_summary(&MemoryStore::new(), &GradeBands::default()).unwrap();
        assert!(!render_compact(&report).unwrap().contains('\n'));
    }
}
