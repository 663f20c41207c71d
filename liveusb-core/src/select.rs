//! Resolving ambiguity with the operator.
//!
//! When discovery finds more than one volume or image, the pipeline asks a
//! [`Chooser`] and validates the raw answer itself. Front-ends only render
//! the list and read a line; tests inject a scripted chooser.
use crate::error::{InstallError, Result};
use std::io;

/// Asks the operator to pick one of several items.
pub trait Chooser {
    /// Presents `items` (in order, to be numbered from 1) under `prompt` and
    /// returns the operator's raw answer.
    fn choose(&mut self, prompt: &str, items: &[String]) -> io::Result<String>;
}

/// Parses a 1-based selection into an index into a list of `count` items.
pub fn parse_index(answer: &str, count: usize) -> Result<usize> {
    let invalid = || InstallError::InvalidSelection {
        input: answer.trim().to_string(),
        count,
    };
    let n: usize = answer.trim().parse().map_err(|_| invalid())?;
    if (1..=count).contains(&n) {
        Ok(n - 1)
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_one_based_indices() {
        assert_eq!(parse_index("1", 3).unwrap(), 0);
        assert_eq!(parse_index(" 3\n", 3).unwrap(), 2);
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        for answer in ["0", "4", "-1", "two", "", "1.5"] {
            match parse_index(answer, 3) {
                Err(InstallError::InvalidSelection { input, count }) => {
                    assert_eq!(input, answer.trim());
                    assert_eq!(count, 3);
                }
                other => panic!("{answer:?} gave {other:?}"),
            }
        }
    }
}
