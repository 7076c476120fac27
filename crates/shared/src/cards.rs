use std::collections::HashSet;

use crate::domain::CardId;

/// Reference card data the core needs. Kept to the one question the run
/// tracking asks.
pub trait CardCatalog: Send + Sync {
    fn is_signature_treasure(&self, card_id: &CardId) -> bool;

    fn find_signature_treasure(&self, deck_list: &[CardId]) -> Option<CardId> {
        deck_list
            .iter()
            .find(|card_id| self.is_signature_treasure(card_id))
            .cloned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignatureTreasureSet {
    cards: HashSet<CardId>,
}

impl SignatureTreasureSet {
    pub fn new(cards: impl IntoIterator<Item = CardId>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardCatalog for SignatureTreasureSet {
    fn is_signature_treasure(&self, card_id: &CardId) -> bool {
        self.cards.contains(card_id)
    }
}
