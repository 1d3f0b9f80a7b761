use log::{debug, warn};
use once_cell::sync::Lazy;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::elements::Element;
use super::state::{Card, MatchState, Side};

/// Static card record; every deck holds one instance per template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardTemplate {
    pub name: String,
    pub element: Element,
    pub cost: u8,
    pub hp: i16,
    pub attack: i16,
    pub speed: u8,
}

impl CardTemplate {
    pub fn new(
        name: impl Into<String>,
        element: Element,
        cost: u8,
        hp: i16,
        attack: i16,
        speed: u8,
    ) -> Self {
        Self {
            name: name.into(),
            element,
            cost,
            hp,
            attack,
            speed,
        }
    }
}

pub static DEFAULT_CATALOG: Lazy<Vec<CardTemplate>> = Lazy::new(|| {
    vec![
        CardTemplate::new("Hinoko", Element::Fire, 1, 20, 16, 4),
        CardTemplate::new("Donezumi", Element::Earth, 1, 25, 14, 1),
        CardTemplate::new("Kinpiyo", Element::Metal, 1, 23, 14, 3),
        CardTemplate::new("Shizuku", Element::Water, 1, 24, 11, 5),
        CardTemplate::new("Kokekabuto", Element::Wood, 1, 28, 10, 2),
        CardTemplate::new("Yaketori", Element::Fire, 2, 22, 18, 6),
        CardTemplate::new("Kurohitsuji", Element::Earth, 2, 27, 16, 3),
        CardTemplate::new("Ougonbuta", Element::Metal, 2, 25, 16, 5),
        CardTemplate::new("Awaawa", Element::Water, 2, 26, 13, 7),
        CardTemplate::new("Maccha", Element::Wood, 2, 30, 12, 4),
    ]
});

/// Result of splitting a shuffled deck into an opening hand and a draw pile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningDeal {
    pub hand: Vec<Card>,
    pub deck: Vec<Card>,
    /// False when no cost-1 card existed and the hand was dealt unguaranteed.
    pub guaranteed: bool,
}

/// One fresh instance per template, shuffled.
pub fn build_deck<R: Rng + ?Sized>(
    state: &mut MatchState,
    catalog: &[CardTemplate],
    owner: Side,
    rng: &mut R,
) -> Vec<Card> {
    let mut deck: Vec<Card> = catalog
        .iter()
        .map(|template| Card::from_template(state.allocate_card_id(), template, owner))
        .collect();
    deck.shuffle(rng);
    deck
}

/// Deals `hand_size` cards with at least one cost-1 card when the deck has any.
///
/// The guaranteed card is picked uniformly among cost-1 cards; the rest are
/// sampled without replacement from everything else. The remaining cards keep
/// their shuffled order as the draw pile. Without a cost-1 card the first
/// `hand_size` cards are taken and the deal is flagged as unguaranteed.
pub fn deal_opening_hand<R: Rng + ?Sized>(
    mut deck: Vec<Card>,
    hand_size: usize,
    rng: &mut R,
) -> OpeningDeal {
    let cost_one: Vec<usize> = deck
        .iter()
        .enumerate()
        .filter(|(_, card)| card.cost == 1)
        .map(|(position, _)| position)
        .collect();

    let Some(&pick) = cost_one.choose(rng) else {
        warn!("deck has no cost-1 card; dealing opening hand without guarantee");
        let split = hand_size.min(deck.len());
        let hand: Vec<Card> = deck.drain(..split).collect();
        return OpeningDeal {
            hand,
            deck,
            guaranteed: false,
        };
    };

    if hand_size == 0 {
        return OpeningDeal {
            hand: Vec::new(),
            deck,
            guaranteed: true,
        };
    }

    let mut hand = Vec::with_capacity(hand_size);
    hand.push(deck.remove(pick));

    let extra = (hand_size - 1).min(deck.len());
    let picked = index::sample(rng, deck.len(), extra).into_vec();
    let mut selected = vec![false; deck.len()];
    for &position in &picked {
        selected[position] = true;
    }
    hand.extend(picked.iter().map(|&position| deck[position].clone()));

    let deck: Vec<Card> = deck
        .into_iter()
        .zip(selected)
        .filter(|(_, taken)| !taken)
        .map(|(card, _)| card)
        .collect();

    debug!(
        "opening hand: {:?}",
        hand.iter()
            .map(|card| format!("{}({})", card.name, card.cost))
            .collect::<Vec<_>>()
    );

    OpeningDeal {
        hand,
        deck,
        guaranteed: true,
    }
}
