//! Recommendation ranking

/// Candidate item the user has not started yet
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub item_id: String,
    pub title: String,
    pub category: String,
    /// Number of readers with progress on this item
    pub readers: i64,
}

/// Order candidates: preferred categories first, then by readers, then
/// by title. Category matching ignores case. Returns at most `limit`.
pub fn rank(mut candidates: Vec<Candidate>, preferred: &[String], limit: usize) -> Vec<Candidate> {
    let preferred: Vec<String> = preferred.iter().map(|c| c.to_lowercase()).collect();
    let is_preferred = |c: &Candidate| preferred.contains(&c.category.to_lowercase());

    candidates.sort_by(|a, b| {
        is_preferred(b)
            .cmp(&is_preferred(a))
            .then_with(|| b.readers.cmp(&a.readers))
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, title: &str, category: &str, readers: i64) -> Candidate {
        Candidate {
            item_id: id.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            readers,
        }
    }

    fn ids(ranked: &[Candidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.item_id.as_str()).collect()
    }

    #[test]
    fn test_preferred_category_first() {
        let ranked = rank(
            vec![
                candidate("a", "Alpha", "negocios", 100),
                candidate("b", "Beta", "Filosofia", 1),
            ],
            &["filosofia".to_string()],
            10,
        );
        assert_eq!(ids(&ranked), vec!["b", "a"]);
    }

    #[test]
    fn test_popularity_then_title() {
        let ranked = rank(
            vec![
                candidate("a", "zeta", "x", 5),
                candidate("b", "Alfa", "x", 5),
                candidate("c", "Gama", "x", 9),
            ],
            &[],
            10,
        );
        assert_eq!(ids(&ranked), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_limit() {
        let ranked = rank(
            vec![
                candidate("a", "A", "x", 1),
                candidate("b", "B", "x", 2),
                candidate("c", "C", "x", 3),
            ],
            &[],
            2,
        );
        assert_eq!(ids(&ranked), vec!["c", "b"]);
        assert!(rank(vec![], &[], 5).is_empty());
    }
}
