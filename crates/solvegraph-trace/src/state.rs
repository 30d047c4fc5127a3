use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solvegraph_expr::Number;

/// The multiset of numbers available to the solver at one point in a trace.
///
/// Values are kept sorted; equality, ordering and hashing all operate on that canonical
/// form, so `(4, 3, 9)` and `(3, 9, 4)` are the same state.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct State(Vec<Number>);

/// Canonical (sorted) form of a multiset of numbers.
pub fn canonicalize<I>(values: I) -> State
where
    I: IntoIterator,
    I::Item: Into<Number>,
{
    let mut values: Vec<Number> = values.into_iter().map(Into::into).collect();
    values.sort();
    State(values)
}

impl State {
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Number>,
    {
        canonicalize(values)
    }

    pub fn values(&self) -> &[Number] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Number> {
        self.0.iter()
    }

    /// Index of the member that `value` refers to: an exact match wins, otherwise the
    /// first member equal to it at `decimals` places.
    fn position_of(values: &[Number], value: Number, decimals: u32) -> Option<usize> {
        values
            .iter()
            .position(|v| *v == value)
            .or_else(|| values.iter().position(|v| v.matches(value, decimals)))
    }

    /// Operands that are not available in this state, counting duplicates: `[1, 1]`
    /// against `(1, 2)` reports one missing `1`.
    pub fn missing(&self, operands: &[Number], decimals: u32) -> Vec<Number> {
        let mut unused = self.0.clone();
        let mut missing = Vec::new();
        for &operand in operands {
            match Self::position_of(&unused, operand, decimals) {
                Some(idx) => {
                    unused.remove(idx);
                }
                None => missing.push(operand),
            }
        }
        missing
    }

    pub fn contains_all(&self, operands: &[Number], decimals: u32) -> bool {
        self.missing(operands, decimals).is_empty()
    }

    /// This state with one occurrence of each operand removed. Operands that are not present
    /// are skipped.
    #[must_use]
    pub fn without(&self, operands: &[Number], decimals: u32) -> State {
        let mut values = self.0.clone();
        for &operand in operands {
            if let Some(idx) = Self::position_of(&values, operand, decimals) {
                values.remove(idx);
            }
        }
        State(values)
    }

    #[must_use]
    pub fn with(&self, value: Number) -> State {
        let mut values = self.0.clone();
        let idx = values.partition_point(|v| *v <= value);
        values.insert(idx, value);
        State(values)
    }

    /// Element-wise comparison of two canonical states at `decimals` places.
    pub fn matches(&self, other: &State, decimals: u32) -> bool {
        self.len() == other.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.matches(*b, decimals))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        if self.0.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<T: Into<Number>, const N: usize> From<[T; N]> for State {
    fn from(values: [T; N]) -> Self {
        canonicalize(values)
    }
}

impl From<Vec<Number>> for State {
    fn from(values: Vec<Number>) -> Self {
        canonicalize(values)
    }
}

impl From<&State> for State {
    fn from(state: &State) -> Self {
        state.clone()
    }
}

impl FromIterator<Number> for State {
    fn from_iter<I: IntoIterator<Item = Number>>(iter: I) -> Self {
        canonicalize(iter)
    }
}

impl<'a> IntoIterator for &'a State {
    type Item = &'a Number;
    type IntoIter = std::slice::Iter<'a, Number>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Number>::deserialize(deserializer).map(canonicalize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nums(values: &[f64]) -> Vec<Number> {
        values.iter().copied().map(Number::from).collect()
    }

    #[test]
    fn displays_like_a_tuple() {
        assert_eq!(State::from([9, 3, 4]).to_string(), "(3, 4, 9)");
        assert_eq!(State::from([24]).to_string(), "(24,)");
        assert_eq!(State::default().to_string(), "()");
        assert_eq!(State::from([1.5, 36.0]).to_string(), "(1.5, 36)");
    }

    #[test]
    fn missing_is_duplicate_aware() {
        let state = State::from([1, 2]);
        assert_eq!(state.missing(&nums(&[1.0, 2.0]), 2), vec![]);
        assert_eq!(state.missing(&nums(&[1.0, 1.0]), 2), nums(&[1.0]));
        assert_eq!(state.missing(&nums(&[1.0, 1.0, 1.0]), 2), nums(&[1.0, 1.0]));

        let state = State::from([1, 3, 3, 3]);
        assert!(state.contains_all(&nums(&[3.0, 3.0, 3.0]), 2));
    }

    #[test]
    fn missing_matches_at_precision() {
        let state = State::from([1.33, 2.0]);
        assert!(state.contains_all(&nums(&[4.0 / 3.0 - 0.001]), 2));
        assert!(!State::from([5, 8]).contains_all(&nums(&[5.5, 8.0]), 2));
    }

    #[test]
    fn without_then_with_keeps_canonical_order() {
        let state = State::from([1, 2, 3, 4]);
        let next = state.without(&nums(&[1.0, 2.0]), 2).with(Number::from(3));
        assert_eq!(next, State::from([3, 3, 4]));
        assert_eq!(next.values(), nums(&[3.0, 3.0, 4.0]).as_slice());
    }

    #[test]
    fn deserializes_into_canonical_form() {
        let state: State = serde_json::from_str("[12, 2, 1.5]").unwrap();
        assert_eq!(state, State::from([1.5, 2.0, 12.0]));
        assert_eq!(serde_json::to_string(&state).unwrap(), "[1.5,2,12]");
    }
}
