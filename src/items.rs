use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// Item ids handed out by the backend live below this value; locally
/// synthesized items are numbered upward from it.
pub const LOCAL_ITEM_ID_START: u64 = 0x7FF0_0000;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Rarity {
    #[default]
    Default,
    Mercenary,
    Commando,
    Assassin,
    Elite,
}

impl Rarity {
    /// Most common first.
    pub const ALL: [Rarity; 5] = [
        Rarity::Default,
        Rarity::Mercenary,
        Rarity::Commando,
        Rarity::Assassin,
        Rarity::Elite,
    ];

    pub fn more_common(self) -> Option<Rarity> {
        match self {
            Rarity::Default => None,
            Rarity::Mercenary => Some(Rarity::Default),
            Rarity::Commando => Some(Rarity::Mercenary),
            Rarity::Assassin => Some(Rarity::Commando),
            Rarity::Elite => Some(Rarity::Assassin),
        }
    }

    pub fn rarer(self) -> Option<Rarity> {
        match self {
            Rarity::Default => Some(Rarity::Mercenary),
            Rarity::Mercenary => Some(Rarity::Commando),
            Rarity::Commando => Some(Rarity::Assassin),
            Rarity::Assassin => Some(Rarity::Elite),
            Rarity::Elite => None,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rarity::Default => "Stock",
            Rarity::Mercenary => "Mercenary Grade",
            Rarity::Commando => "Commando Grade",
            Rarity::Assassin => "Assassin Grade",
            Rarity::Elite => "Elite Grade",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ItemQuality {
    Normal,
    Unusual,
    #[default]
    Unique,
    Strange,
}

impl ItemQuality {
    /// Numeric quality id used by the item schema.
    pub fn code(self) -> u8 {
        match self {
            ItemQuality::Normal => 0,
            ItemQuality::Unusual => 5,
            ItemQuality::Unique => 6,
            ItemQuality::Strange => 11,
        }
    }
}

impl fmt::Display for ItemQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ItemOrigin {
    TradeUp,
    FoundInCrate,
    Crafted,
}

impl fmt::Display for ItemOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemOrigin::TradeUp => "Trade-Up",
            ItemOrigin::FoundInCrate => "Found in Crate",
            ItemOrigin::Crafted => "Crafted",
        };
        write!(f, "{name}")
    }
}

/// Static template of an item in the schema catalog.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub index: u32,
    pub name: String,
    pub item_class: String,
    #[serde(default)]
    pub rarity: Rarity,
}

impl ItemDefinition {
    pub fn is_weapon(&self) -> bool {
        self.item_class.contains("weapon")
    }

    pub fn allows_inspect(&self) -> bool {
        !self.item_class.contains("tool")
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ItemCollection {
    pub index: u32,
    pub name: String,
    pub items: Vec<u32>,
}

/// An item instance granted to the player, either by the backend or
/// synthesized locally.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GrantedItem {
    pub item_id: u64,
    pub definition_index: u32,
    pub quality: ItemQuality,
    pub rarity: Rarity,
    pub origin: ItemOrigin,
    pub is_strange: bool,
    pub is_unusual: bool,
}

impl GrantedItem {
    pub fn is_local(&self) -> bool {
        self.item_id > LOCAL_ITEM_ID_START
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn code__matches_schema_quality_ids() {
        assert_eq!(ItemQuality::Normal.code(), 0);
        assert_eq!(ItemQuality::Unusual.code(), 5);
        assert_eq!(ItemQuality::Unique.code(), 6);
        assert_eq!(ItemQuality::Strange.code(), 11);
    }

    #[test]
    fn more_common__and_rarer_walk_the_tier_ladder() {
        assert_eq!(Rarity::Elite.more_common(), Some(Rarity::Assassin));
        assert_eq!(Rarity::Default.more_common(), None);
        assert_eq!(Rarity::Default.rarer(), Some(Rarity::Mercenary));
        assert_eq!(Rarity::Elite.rarer(), None);
    }
}
