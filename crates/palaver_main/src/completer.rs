use inquire::autocompletion::Replacement;
use inquire::Autocomplete;

/// Completes slash commands typed at the prompt.
#[derive(Clone)]
pub struct Completion {
    suggestions: Vec<String>,
}

impl Completion {
    pub fn new(completions: Vec<impl ToString>) -> Self {
        Self::from_iter(completions)
    }
}

impl<A: ToString> FromIterator<A> for Completion {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        let suggestions = iter.into_iter().map(|s| s.to_string()).collect();
        Self { suggestions }
    }
}

impl Autocomplete for Completion {
    fn get_suggestions(&mut self, input: &str) -> Result<Vec<String>, inquire::CustomUserError> {
        let input = input.trim().to_lowercase();
        if !input.starts_with('/') {
            return Ok(Vec::new());
        }

        Ok(self
            .suggestions
            .iter()
            .filter(|command| command.starts_with(&input))
            .cloned()
            .collect())
    }

    fn get_completion(
        &mut self,
        _: &str,
        highlighted_suggestion: Option<String>,
    ) -> Result<Replacement, inquire::CustomUserError> {
        Ok(Replacement::from(highlighted_suggestion))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_completion() {
        let mut completion = Completion::new(vec!["/effort", "/exit", "/tools"]);

        let actual = completion.get_suggestions("").unwrap();
        assert_eq!(actual, Vec::<String>::new());

        let actual = completion.get_suggestions("/e").unwrap();
        assert_eq!(actual, vec!["/effort", "/exit"]);

        let actual = completion.get_suggestions("/TO").unwrap();
        assert_eq!(actual, vec!["/tools"]);

        let actual = completion.get_suggestions("tools").unwrap();
        assert_eq!(actual, Vec::<String>::new());
    }
}
