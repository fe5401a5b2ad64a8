use crate::config::MatcherConfig;

/// Whole-string Levenshtein similarity on a 0-100 scale.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best similarity between the shorter string and any equal-length window of
/// the longer one, on a 0-100 scale. Windows are taken over characters, not
/// bytes.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_chars: Vec<char> = short.chars().collect();
    let long_chars: Vec<char> = long.chars().collect();
    if short_chars.is_empty() {
        return if long_chars.is_empty() { 100.0 } else { 0.0 };
    }

    let window = short_chars.len();
    let mut best = 0.0_f64;
    for start in 0..=(long_chars.len() - window) {
        let slice: String = long_chars[start..start + window].iter().collect();
        let score = strsim::normalized_levenshtein(short, &slice) * 100.0;
        if score > best {
            best = score;
        }
    }
    best
}

/// Decides whether a quiz subject earns the score multiplier.
///
/// Each configured subject is compared against the submitted one on
/// lowercased, trimmed text: containment in either direction wins outright,
/// then the whole-string ratio, then the windowed partial ratio.
pub fn is_boosted(subject: &str, config: &MatcherConfig) -> bool {
    let subject = subject.trim().to_lowercase();
    for entry in &config.subjects {
        let entry = entry.trim().to_lowercase();
        if subject.contains(&entry) || entry.contains(&subject) {
            return true;
        }
        if similarity_ratio(&subject, &entry) >= config.ratio_threshold {
            return true;
        }
        if partial_ratio(&subject, &entry) >= config.partial_ratio_threshold {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(subjects: &[&str]) -> MatcherConfig {
        MatcherConfig {
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            ..MatcherConfig::default()
        }
    }

    #[test]
    fn similarity_ratio_is_reflexive() {
        assert_eq!(similarity_ratio("kubernetes", "kubernetes"), 100.0);
        assert_eq!(similarity_ratio("", ""), 100.0);
    }

    #[test]
    fn similarity_ratio_known_value() {
        // distance 3 over max length 7
        let ratio = similarity_ratio("kitten", "sitting");
        assert!((ratio - 57.142857).abs() < 0.001, "got {ratio}");
    }

    #[test]
    fn partial_ratio_finds_exact_window() {
        assert_eq!(partial_ratio("shift", "openshift"), 100.0);
        assert_eq!(partial_ratio("openshift", "shift"), 100.0);
    }

    #[test]
    fn partial_ratio_empty_inputs() {
        assert_eq!(partial_ratio("", ""), 100.0);
        assert_eq!(partial_ratio("", "kubernetes"), 0.0);
    }

    #[test]
    fn boosted_by_exact_match() {
        let config = config_with(&["Kubernetes"]);
        assert!(is_boosted("kubernetes", &config));
        assert!(is_boosted("  Kubernetes  ", &config));
    }

    #[test]
    fn boosted_by_containment_either_direction() {
        let config = config_with(&["Kubernetes"]);
        assert!(is_boosted("Kubernetes Basics", &config));
        assert!(is_boosted("kube", &config));
    }

    #[test]
    fn boosted_by_ratio_on_typo() {
        // one deletion, ratio 90
        let config = config_with(&["Kubernetes"]);
        assert!(is_boosted("kuberntes", &config));
    }

    #[test]
    fn not_boosted_on_unrelated_subject() {
        let config = config_with(&["Kubernetes", "OpenShift"]);
        assert!(!is_boosted("french baking", &config));
    }

    #[test]
    fn empty_subject_list_never_boosts() {
        let config = config_with(&[]);
        assert!(!is_boosted("kubernetes", &config));
    }

    #[test]
    fn thresholds_come_from_config() {
        let mut config = config_with(&["Kubernetes"]);
        config.ratio_threshold = 95.0;
        config.partial_ratio_threshold = 101.0;
        // ratio for the typo is 90, below the raised threshold
        assert!(!is_boosted("kuberntes", &config));
    }
}
