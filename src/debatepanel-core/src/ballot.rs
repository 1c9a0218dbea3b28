//! Argument labelling, vote parsing, and the tally.

use std::fmt;

use crate::prompt::MISSING_ARGUMENT;
use crate::session::PersonaArguments;

/// One labelled argument presented to the voters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledArgument {
    pub label: usize,
    pub persona: String,
    pub text: String,
}

/// Labels 1..=N assigned to each persona's best argument, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentMap {
    entries: Vec<LabeledArgument>,
}

impl ArgumentMap {
    pub fn build(arguments: &[PersonaArguments]) -> Self {
        let entries = arguments
            .iter()
            .enumerate()
            .map(|(i, args)| LabeledArgument {
                label: i + 1,
                persona: args.persona.name.clone(),
                text: args.best_argument().unwrap_or(MISSING_ARGUMENT).to_string(),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, label: usize) -> bool {
        label >= 1 && label <= self.entries.len()
    }

    pub fn get(&self, label: usize) -> Option<&LabeledArgument> {
        label.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn persona_for(&self, label: usize) -> Option<&str> {
        self.get(label).map(|e| e.persona.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledArgument> {
        self.entries.iter()
    }
}

/// A resolved vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ballot {
    Label(usize),
    Spoiled,
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ballot::Label(label) => write!(f, "{}", label),
            Ballot::Spoiled => f.write_str("Spoiled"),
        }
    }
}

/// Resolve a raw vote response to a ballot.
///
/// Only the first digit character counts, so "I vote for argument 2 because
/// of point 3" is a vote for 2. No digit, or a digit that is not a label,
/// spoils the ballot. Non-ASCII digits such as `²` count as the first digit
/// but never name a label.
pub fn parse_vote(raw: &str, map: &ArgumentMap) -> Ballot {
    raw.chars()
        .find(|c| c.is_numeric())
        .and_then(|c| if c.is_ascii_digit() { c.to_digit(10) } else { None })
        .map(|d| d as usize)
        .filter(|&label| map.contains(label))
        .map_or(Ballot::Spoiled, Ballot::Label)
}

/// Result of the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Winner { label: usize },
    Tie,
}

/// Ballot counts per label plus the spoiled bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    counts: Vec<usize>,
    spoiled: usize,
}

impl VoteTally {
    /// Zeroed buckets for every label in the map.
    pub fn new(map: &ArgumentMap) -> Self {
        Self {
            counts: vec![0; map.len()],
            spoiled: 0,
        }
    }

    pub fn from_ballots<'a>(map: &ArgumentMap, ballots: impl IntoIterator<Item = &'a Ballot>) -> Self {
        let mut tally = Self::new(map);
        for ballot in ballots {
            tally.cast(*ballot);
        }
        tally
    }

    pub fn cast(&mut self, ballot: Ballot) {
        match ballot {
            Ballot::Label(label) if label >= 1 && label <= self.counts.len() => {
                self.counts[label - 1] += 1;
            }
            _ => self.spoiled += 1,
        }
    }

    pub fn count(&self, label: usize) -> usize {
        label
            .checked_sub(1)
            .and_then(|i| self.counts.get(i))
            .copied()
            .unwrap_or(0)
    }

    pub fn spoiled(&self) -> usize {
        self.spoiled
    }

    /// Total ballots cast, spoiled included.
    pub fn ballots(&self) -> usize {
        self.counts.iter().sum::<usize>() + self.spoiled
    }

    /// `(label, count)` for every label in order.
    pub fn label_counts(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().enumerate().map(|(i, &c)| (i + 1, c))
    }

    /// True when no label out-polls the spoiled bucket, which includes an
    /// empty count.
    pub fn spoiled_leads(&self) -> bool {
        self.counts.iter().all(|&c| c <= self.spoiled)
    }

    /// A label wins only if its count is positive and no other bucket,
    /// the spoiled bucket included, reaches the same count.
    pub fn verdict(&self) -> Verdict {
        let top = self.counts.iter().copied().max().unwrap_or(0).max(self.spoiled);
        if top == 0 {
            return Verdict::Tie;
        }

        let holders = self.counts.iter().filter(|&&c| c == top).count()
            + usize::from(self.spoiled == top);
        if holders != 1 || self.spoiled == top {
            return Verdict::Tie;
        }

        self.counts
            .iter()
            .position(|&c| c == top)
            .map_or(Verdict::Tie, |i| Verdict::Winner { label: i + 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Persona;
    use crate::session::Statement;

    fn map_of(names: &[&str]) -> ArgumentMap {
        let args: Vec<PersonaArguments> = names
            .iter()
            .map(|n| {
                let mut a = PersonaArguments::new(Persona::new(*n, "m", ""));
                a.opening = Some(Statement::Delivered(format!("{n} opens")));
                a
            })
            .collect();
        ArgumentMap::build(&args)
    }

    #[test]
    fn test_argument_map_labels_follow_order() {
        let map = map_of(&["A", "B", "C"]);
        assert_eq!(map.persona_for(1), Some("A"));
        assert_eq!(map.persona_for(3), Some("C"));
        assert_eq!(map.persona_for(0), None);
        assert_eq!(map.persona_for(4), None);
        assert_eq!(map.get(2).unwrap().text, "B opens");
    }

    #[test]
    fn test_argument_map_placeholder_for_silent_persona() {
        let args = vec![PersonaArguments::new(Persona::new("Mute", "m", ""))];
        let map = ArgumentMap::build(&args);
        assert_eq!(map.get(1).unwrap().text, MISSING_ARGUMENT);
    }

    #[test]
    fn test_parse_vote_takes_first_digit() {
        let map = map_of(&["A", "B", "C"]);
        assert_eq!(parse_vote("2", &map), Ballot::Label(2));
        assert_eq!(
            parse_vote("I vote for argument 2 because point 3 was weak.", &map),
            Ballot::Label(2)
        );
        assert_eq!(parse_vote("Argument #3!", &map), Ballot::Label(3));
    }

    #[test]
    fn test_parse_vote_spoils_out_of_range_or_missing() {
        let map = map_of(&["A", "B", "C"]);
        assert_eq!(parse_vote("7", &map), Ballot::Spoiled);
        assert_eq!(parse_vote("0", &map), Ballot::Spoiled);
        assert_eq!(parse_vote("The second one.", &map), Ballot::Spoiled);
        assert_eq!(parse_vote("", &map), Ballot::Spoiled);
        // Only the first digit counts: "12" reads as 1.
        assert_eq!(parse_vote("12", &map), Ballot::Label(1));
    }

    #[test]
    fn test_parse_vote_non_ascii_digit_comes_first() {
        let map = map_of(&["A", "B", "C"]);
        assert_eq!(parse_vote("²2", &map), Ballot::Spoiled);
        assert_eq!(parse_vote("２", &map), Ballot::Spoiled);
        assert_eq!(parse_vote("<Argument 2> was best", &map), Ballot::Label(2));
    }

    #[test]
    fn test_spoiled_leads() {
        let map = map_of(&["A", "B", "C"]);
        assert!(VoteTally::new(&map).spoiled_leads());

        let spoiled = [Ballot::Label(1), Ballot::Spoiled, Ballot::Spoiled];
        assert!(VoteTally::from_ballots(&map, &spoiled).spoiled_leads());

        let level = [Ballot::Label(1), Ballot::Spoiled];
        assert!(VoteTally::from_ballots(&map, &level).spoiled_leads());

        let split = [Ballot::Label(1), Ballot::Label(2)];
        let tally = VoteTally::from_ballots(&map, &split);
        assert_eq!(tally.verdict(), Verdict::Tie);
        assert!(!tally.spoiled_leads());
    }

    #[test]
    fn test_plurality_winner() {
        let map = map_of(&["A", "B", "C"]);
        let ballots = [Ballot::Label(2), Ballot::Label(2), Ballot::Label(3)];
        let tally = VoteTally::from_ballots(&map, &ballots);
        assert_eq!(tally.count(2), 2);
        assert_eq!(tally.count(3), 1);
        assert_eq!(tally.spoiled(), 0);
        assert_eq!(tally.verdict(), Verdict::Winner { label: 2 });
    }

    #[test]
    fn test_three_way_split_is_tie() {
        let map = map_of(&["A", "B", "C"]);
        let ballots = [Ballot::Label(1), Ballot::Label(2), Ballot::Spoiled];
        let tally = VoteTally::from_ballots(&map, &ballots);
        assert_eq!(tally.verdict(), Verdict::Tie);
    }

    #[test]
    fn test_tie_with_spoiled_bucket_voids_win() {
        let map = map_of(&["A", "B", "C", "D"]);
        let ballots = [
            Ballot::Label(1),
            Ballot::Label(1),
            Ballot::Spoiled,
            Ballot::Spoiled,
        ];
        assert_eq!(VoteTally::from_ballots(&map, &ballots).verdict(), Verdict::Tie);
    }

    #[test]
    fn test_spoiled_majority_is_tie() {
        let map = map_of(&["A", "B", "C"]);
        let ballots = [Ballot::Spoiled, Ballot::Spoiled, Ballot::Label(1)];
        assert_eq!(VoteTally::from_ballots(&map, &ballots).verdict(), Verdict::Tie);
    }

    #[test]
    fn test_no_ballots_is_tie() {
        let map = map_of(&["A", "B"]);
        let tally = VoteTally::new(&map);
        assert_eq!(tally.ballots(), 0);
        assert_eq!(tally.verdict(), Verdict::Tie);
    }

    #[test]
    fn test_single_ballot_wins() {
        let map = map_of(&["A", "B", "C"]);
        let tally = VoteTally::from_ballots(&map, &[Ballot::Label(3)]);
        assert_eq!(tally.verdict(), Verdict::Winner { label: 3 });
    }

    #[test]
    fn test_ballot_sum_matches_cast() {
        let map = map_of(&["A", "B", "C"]);
        let ballots = [Ballot::Label(1), Ballot::Spoiled, Ballot::Label(3), Ballot::Label(9)];
        let tally = VoteTally::from_ballots(&map, &ballots);
        assert_eq!(tally.ballots(), ballots.len());
        assert_eq!(tally.spoiled(), 2);
    }
}
