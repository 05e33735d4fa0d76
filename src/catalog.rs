use crate::{
    collaborators::ItemSchema,
    items::{
        ItemCollection,
        ItemDefinition,
        Rarity,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    fs,
    path::Path,
};

pub const CONCEALED_KILLER_COLLECTION: u32 = 1;
pub const MANN_CO_CRATE_COLLECTION: u32 = 2;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub definitions: Vec<ItemDefinition>,
    pub collections: Vec<ItemCollection>,
    #[serde(skip)]
    definition_lookup: HashMap<u32, usize>,
}

impl Catalog {
    pub fn new(definitions: Vec<ItemDefinition>, collections: Vec<ItemCollection>) -> Self {
        let mut catalog = Self {
            definitions,
            collections,
            definition_lookup: HashMap::new(),
        };
        catalog.reindex();
        catalog
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .wrap_err_with(|| format!("Failed to read item catalog at {}", path.display()))?;
        let catalog = serde_json::from_slice::<Catalog>(&data)
            .wrap_err("Failed to parse item catalog JSON")?;
        Ok(Self::new(catalog.definitions, catalog.collections))
    }

    /// Small catalog used by the terminal client when no file is given.
    pub fn builtin() -> Self {
        let def = |index: u32, name: &str, item_class: &str, rarity: Rarity| ItemDefinition {
            index,
            name: name.to_string(),
            item_class: item_class.to_string(),
            rarity,
        };
        let definitions = vec![
            def(15000, "Night Owl Sniper Rifle", "tf_weapon_sniperrifle", Rarity::Mercenary),
            def(15001, "Woodsy Widowmaker SMG", "tf_weapon_smg", Rarity::Mercenary),
            def(15002, "Night Terror Scattergun", "tf_weapon_scattergun", Rarity::Mercenary),
            def(15003, "Purple Range Sniper Rifle", "tf_weapon_sniperrifle", Rarity::Commando),
            def(15004, "King of the Jungle Minigun", "tf_weapon_minigun", Rarity::Commando),
            def(15005, "Forest Fire Flame Thrower", "tf_weapon_flamethrower", Rarity::Assassin),
            def(15006, "Sand Cannon Rocket Launcher", "tf_weapon_rocketlauncher", Rarity::Elite),
            def(30000, "Pyromancer's Hood", "tf_wearable", Rarity::Default),
            def(30001, "Bounty Hat", "tf_wearable", Rarity::Default),
            def(30002, "Brigade Helm", "tf_wearable", Rarity::Mercenary),
            def(30003, "Name Tag", "tool", Rarity::Default),
        ];
        let collections = vec![
            ItemCollection {
                index: CONCEALED_KILLER_COLLECTION,
                name: "Concealed Killer Collection".to_string(),
                items: (15000..=15006).collect(),
            },
            ItemCollection {
                index: MANN_CO_CRATE_COLLECTION,
                name: "Mann Co. Supply Crate".to_string(),
                items: vec![30000, 30001, 30002, 30003],
            },
        ];
        Self::new(definitions, collections)
    }

    pub fn definition_name(&self, index: u32) -> &str {
        self.definition_lookup
            .get(&index)
            .map(|pos| self.definitions[*pos].name.as_str())
            .unwrap_or("Unknown Item")
    }

    fn reindex(&mut self) {
        self.definition_lookup = self
            .definitions
            .iter()
            .enumerate()
            .map(|(pos, def)| (def.index, pos))
            .collect();
    }
}

impl ItemSchema for Catalog {
    fn item_definition(&self, index: u32) -> Option<ItemDefinition> {
        self.definition_lookup
            .get(&index)
            .map(|pos| self.definitions[*pos].clone())
    }

    fn collection(&self, index: u32) -> Option<ItemCollection> {
        self.collections.iter().find(|c| c.index == index).cloned()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use tempdir::TempDir;

    #[test]
    fn builtin__resolves_every_collection_member() {
        let catalog = Catalog::builtin();
        for collection in &catalog.collections {
            let candidates = catalog.collection_candidates(collection.index).unwrap();
            assert_eq!(candidates.len(), collection.items.len());
        }
    }

    #[test]
    fn load__reads_catalog_written_as_json() {
        // given
        let dir = TempDir::new("catalog").unwrap();
        let path = dir.path().join("catalog.json");
        let builtin = Catalog::builtin();
        fs::write(&path, serde_json::to_vec_pretty(&builtin).unwrap()).unwrap();

        // when
        let loaded = Catalog::load(&path).unwrap();

        // then
        assert_eq!(loaded.definitions, builtin.definitions);
        assert_eq!(loaded.definition_name(15006), "Sand Cannon Rocket Launcher");
    }

    #[test]
    fn collection_candidates__skips_unknown_definitions() {
        let catalog = Catalog::new(
            vec![ItemDefinition {
                index: 1,
                name: "Only".to_string(),
                item_class: "tf_wearable".to_string(),
                rarity: Rarity::Default,
            }],
            vec![ItemCollection {
                index: 9,
                name: "Partial".to_string(),
                items: vec![1, 2],
            }],
        );
        let candidates = catalog.collection_candidates(9).unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(catalog.collection_candidates(10).is_none());
    }
}
