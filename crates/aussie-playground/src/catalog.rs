//! The canned programs the playground offers, embedded at build time.

pub struct Example {
    pub name: &'static str,
    pub source: &'static str,
}

pub static EXAMPLES: [Example; 4] = [
    Example {
        name: "dreamtime",
        source: include_str!("../programs/dreamtime.aussie"),
    },
    Example {
        name: "fibonacci",
        source: include_str!("../programs/fibonacci.aussie"),
    },
    Example {
        name: "time",
        source: include_str!("../programs/time.aussie"),
    },
    Example {
        name: "random_beer",
        source: include_str!("../programs/random_beer.aussie"),
    },
];

pub fn find(name: &str) -> Option<&'static Example> {
    let name = name.strip_suffix(".aussie").unwrap_or(name);
    EXAMPLES.iter().find(|example| example.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_example_is_a_complete_program() {
        for example in &EXAMPLES {
            assert!(
                example.source.trim_start().starts_with("G'DAY MATE!"),
                "{} is missing its opener",
                example.name
            );
            assert!(
                example.source.contains("CHEERS C***!"),
                "{} is missing its closer",
                example.name
            );
        }
    }

    #[test]
    fn find_accepts_the_file_extension() {
        assert!(find("fibonacci.aussie").is_some());
        assert!(find("fibonacci").is_some());
        assert!(find("quokka").is_none());
    }
}
