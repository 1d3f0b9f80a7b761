use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The five elements of the overcoming cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    #[serde(alias = "木")]
    Wood,
    #[serde(alias = "火")]
    Fire,
    #[serde(alias = "土")]
    Earth,
    #[serde(alias = "金")]
    Metal,
    #[serde(alias = "水")]
    Water,
}

impl Element {
    pub const ALL: [Element; 5] = [
        Element::Wood,
        Element::Fire,
        Element::Earth,
        Element::Metal,
        Element::Water,
    ];

    /// Overcoming cycle: Wood -> Earth -> Water -> Fire -> Metal -> Wood
    pub const fn beats(self) -> Element {
        match self {
            Element::Wood => Element::Earth,
            Element::Fire => Element::Metal,
            Element::Earth => Element::Water,
            Element::Metal => Element::Wood,
            Element::Water => Element::Fire,
        }
    }

    pub const fn beaten_by(self) -> Element {
        match self {
            Element::Earth => Element::Wood,
            Element::Metal => Element::Fire,
            Element::Water => Element::Earth,
            Element::Wood => Element::Metal,
            Element::Fire => Element::Water,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Element::Wood => "wood",
            Element::Fire => "fire",
            Element::Earth => "earth",
            Element::Metal => "metal",
            Element::Water => "water",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Element {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wood" | "木" => Ok(Element::Wood),
            "fire" | "火" => Ok(Element::Fire),
            "earth" | "土" => Ok(Element::Earth),
            "metal" | "金" => Ok(Element::Metal),
            "water" | "水" => Ok(Element::Water),
            _ => Err(()),
        }
    }
}

/// True when the attacker's element overcomes the defender's.
pub fn is_effective(attacker: Element, defender: Element) -> bool {
    attacker.beats() == defender
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overcoming_cycle_pairs() {
        use Element::*;
        assert!(is_effective(Wood, Earth));
        assert!(is_effective(Fire, Metal));
        assert!(is_effective(Earth, Water));
        assert!(is_effective(Metal, Wood));
        assert!(is_effective(Water, Fire));

        assert!(!is_effective(Fire, Water));
        assert!(!is_effective(Fire, Wood));
        assert!(!is_effective(Earth, Earth));
    }

    #[test]
    fn advantage_is_never_mutual_or_reflexive() {
        for attacker in Element::ALL {
            assert!(!is_effective(attacker, attacker), "{attacker} beats itself");
            for defender in Element::ALL {
                assert!(
                    !(is_effective(attacker, defender) && is_effective(defender, attacker)),
                    "{attacker} and {defender} beat each other"
                );
            }
        }
    }

    #[test]
    fn each_element_wins_and_loses_exactly_once() {
        for element in Element::ALL {
            let wins = Element::ALL
                .iter()
                .filter(|other| is_effective(element, **other))
                .count();
            let losses = Element::ALL
                .iter()
                .filter(|other| is_effective(**other, element))
                .count();
            assert_eq!(wins, 1);
            assert_eq!(losses, 1);
            assert_eq!(element.beats().beaten_by(), element);
        }
    }

    #[test]
    fn parses_english_and_kanji_names() {
        assert_eq!("Fire".parse::<Element>(), Ok(Element::Fire));
        assert_eq!("金".parse::<Element>(), Ok(Element::Metal));
        assert!("lightning".parse::<Element>().is_err());

        let parsed: Element = serde_json::from_str("\"水\"").expect("kanji alias");
        assert_eq!(parsed, Element::Water);
        assert_eq!(serde_json::to_string(&Element::Wood).unwrap(), "\"wood\"");
    }
}
