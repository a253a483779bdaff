use super::PointSet;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Point sets keyed by chain identifier.
///
/// Chains keep their insertion order, which is also the tie-breaking order used when
/// predicted chains are assigned to reference chains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSet {
    chains: Vec<(String, PointSet)>,
}

impl ChainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a chain, replacing the points of an existing chain with the same id.
    pub fn insert(&mut self, chain_id: impl Into<String>, points: PointSet) {
        let chain_id = chain_id.into();
        match self.chains.iter_mut().find(|(id, _)| *id == chain_id) {
            Some((_, existing)) => *existing = points,
            None => self.chains.push((chain_id, points)),
        }
    }

    /// Appends one point to a chain, creating the chain if needed.
    pub fn push_point(&mut self, chain_id: &str, point: Point3<f64>) {
        match self.chains.iter_mut().find(|(id, _)| id == chain_id) {
            Some((_, points)) => points.push(point),
            None => self.chains.push((chain_id.to_string(), vec![point])),
        }
    }

    pub fn get(&self, chain_id: &str) -> Option<&PointSet> {
        self.chains
            .iter()
            .find(|(id, _)| id == chain_id)
            .map(|(_, points)| points)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = &str> {
        self.chains.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PointSet)> {
        self.chains.iter().map(|(id, points)| (id.as_str(), points))
    }

    /// All chains joined into one point set, in chain order.
    pub fn concatenated(&self) -> PointSet {
        self.chains
            .iter()
            .flat_map(|(_, points)| points.iter().copied())
            .collect()
    }

    /// Total number of points across all chains.
    pub fn total_points(&self) -> usize {
        self.chains.iter().map(|(_, points)| points.len()).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, PointSet)> for ChainSet {
    fn from_iter<I: IntoIterator<Item = (S, PointSet)>>(iter: I) -> Self {
        let mut set = ChainSet::new();
        for (id, points) in iter {
            set.insert(id, points);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize) -> PointSet {
        (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn insertion_order_is_preserved() {
        let set: ChainSet = [("B", points(2)), ("A", points(3)), ("C", points(1))]
            .into_iter()
            .collect();

        let ids: Vec<_> = set.chain_ids().collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
        assert_eq!(set.total_points(), 6);
    }

    #[test]
    fn insert_replaces_existing_chain_in_place() {
        let mut set = ChainSet::new();
        set.insert("A", points(2));
        set.insert("B", points(2));
        set.insert("A", points(5));

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("A").unwrap().len(), 5);
        assert_eq!(set.chain_ids().next(), Some("A"));
    }

    #[test]
    fn concatenation_follows_chain_order() {
        let set: ChainSet = [("B", points(2)), ("A", points(1))].into_iter().collect();

        let joined = set.concatenated();

        assert_eq!(joined.len(), 3);
        assert_eq!(joined[2], Point3::origin());
        assert_eq!(joined[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn push_point_creates_and_extends_chains() {
        let mut set = ChainSet::new();
        set.push_point("A", Point3::origin());
        set.push_point("A", Point3::new(1.0, 0.0, 0.0));
        set.push_point("B", Point3::origin());

        assert_eq!(set.get("A").unwrap().len(), 2);
        assert_eq!(set.get("B").unwrap().len(), 1);
        assert!(set.get("C").is_none());
    }
}
