use std::collections::HashMap;

use jomini::text::{ArrayReader, ObjectReader, Operator, ValueReader};
use jomini::{Encoding, TextToken};
use log::{debug, warn};

use crate::climate::modifiers::{ModifierSet, ModifierValue};
use crate::climate::{ClimateModel, SemanticError};
use crate::config::{ClimateSettings, DuplicatePolicy};

/// Обходит дерево разбора `climate.txt` и собирает модель климатов
///
/// Каждое поле верхнего уровня `name = { ... }` — либо блок модификаторов
/// (`key = value`), либо список провинций (голые числа).
pub(crate) struct ClimateVisitor<'s> {
    settings: &'s ClimateSettings,
    modifiers: HashMap<String, ModifierSet>,
    provinces: HashMap<String, Vec<u32>>,
}

impl<'s> ClimateVisitor<'s> {
    pub(crate) fn new(settings: &'s ClimateSettings) -> Self {
        Self {
            settings,
            modifiers: HashMap::new(),
            provinces: HashMap::new(),
        }
    }

    pub(crate) fn visit_climate<E>(
        mut self,
        root: &ObjectReader<'_, '_, E>,
    ) -> Result<ClimateModel, SemanticError>
    where
        E: Encoding + Clone,
    {
        for (key, op, value) in root.fields() {
            let name = key.read_string();
            check_operator(&name, op)?;

            let unexpected = || SemanticError::UnexpectedScalar {
                name: name.clone(),
                value: value.read_string().unwrap_or_default(),
            };
            match value.token() {
                // `{ t = 3 1 2 }` и `{ 1 2 t = 3 }`: jomini помечает такие блоки как смешанные
                TextToken::Object { mixed: true, .. } | TextToken::Array { mixed: true, .. } => {
                    return Err(SemanticError::MixedBlock { climate: name });
                }
                TextToken::Object { .. } => {
                    let block = value.read_object().map_err(|_| unexpected())?;
                    self.visit_modifier_block(name, &block)?;
                }
                TextToken::Array { .. } => {
                    let list = value.read_array().map_err(|_| unexpected())?;
                    self.visit_province_block(name, &list)?;
                }
                _ => return Err(unexpected()),
            }
        }

        debug!(
            "Visited {} climates, {} province lists",
            self.modifiers.len(),
            self.provinces.len()
        );
        Ok(ClimateModel {
            climate_modifiers: self.modifiers,
            climate_provinces: self.provinces,
        })
    }

    fn visit_modifier_block<E>(
        &mut self,
        name: String,
        block: &ObjectReader<'_, '_, E>,
    ) -> Result<(), SemanticError>
    where
        E: Encoding + Clone,
    {
        let mut set = ModifierSet::new();
        for (key, op, value) in block.fields() {
            let modifier = key.read_string();
            check_operator(&modifier, op)?;
            let value = read_modifier_value(&name, &modifier, &value)?;
            set.insert(modifier, value);
        }

        if set.is_empty() {
            self.visit_empty_block(name)
        } else {
            self.declare_modifiers(name, set)
        }
    }

    fn visit_province_block<E>(
        &mut self,
        name: String,
        list: &ArrayReader<'_, '_, E>,
    ) -> Result<(), SemanticError>
    where
        E: Encoding + Clone,
    {
        let mut ids = Vec::with_capacity(list.len());
        for entry in list.values() {
            if matches!(entry.token(), TextToken::MixedContainer | TextToken::Operator(_)) {
                return Err(SemanticError::MixedBlock { climate: name });
            }
            let id = entry
                .read_scalar()
                .ok()
                .and_then(|scalar| scalar.to_u64().ok())
                .and_then(|id| u32::try_from(id).ok());
            match id {
                Some(id) => ids.push(id),
                None => {
                    return Err(SemanticError::InvalidProvince {
                        climate: name,
                        value: entry.read_string().unwrap_or_default(),
                    });
                }
            }
        }

        if ids.is_empty() {
            self.visit_empty_block(name)
        } else {
            self.declare_provinces(name, ids)
        }
    }

    /// `name = {}` ничего не говорит о своём виде. Блок модификаторов в файле всегда
    /// идёт раньше списка провинций, поэтому первый пустой блок считается модификаторами.
    fn visit_empty_block(&mut self, name: String) -> Result<(), SemanticError> {
        if self.modifiers.contains_key(&name) {
            self.declare_provinces(name, Vec::new())
        } else {
            self.declare_modifiers(name, ModifierSet::new())
        }
    }

    fn declare_modifiers(&mut self, name: String, set: ModifierSet) -> Result<(), SemanticError> {
        if self.modifiers.contains_key(&name) {
            match self.settings.duplicates {
                DuplicatePolicy::Reject => {
                    return Err(SemanticError::DuplicateModifiers { climate: name });
                }
                DuplicatePolicy::LastWriteWins => {
                    warn!("Climate {name} redeclares its modifiers, keeping the last block");
                }
            }
        }

        debug!("Climate {name}: {} modifiers", set.len());
        self.modifiers.insert(name, set);
        Ok(())
    }

    fn declare_provinces(&mut self, name: String, ids: Vec<u32>) -> Result<(), SemanticError> {
        if !self.modifiers.contains_key(&name) {
            match self.settings.duplicates {
                DuplicatePolicy::Reject => {
                    return Err(SemanticError::UndeclaredClimate { climate: name });
                }
                DuplicatePolicy::LastWriteWins => {
                    warn!("Provinces listed for climate {name} before its modifiers");
                }
            }
        }
        if self.provinces.contains_key(&name) {
            match self.settings.duplicates {
                DuplicatePolicy::Reject => {
                    return Err(SemanticError::DuplicateProvinces { climate: name });
                }
                DuplicatePolicy::LastWriteWins => {
                    warn!("Climate {name} redeclares its provinces, keeping the last list");
                }
            }
        }

        debug!("Climate {name}: {} provinces", ids.len());
        self.provinces.insert(name, ids);
        Ok(())
    }
}

fn read_modifier_value<E>(
    climate: &str,
    modifier: &str,
    value: &ValueReader<'_, '_, E>,
) -> Result<ModifierValue, SemanticError>
where
    E: Encoding + Clone,
{
    let nested = || SemanticError::NestedModifier {
        climate: climate.to_string(),
        modifier: modifier.to_string(),
    };
    if !matches!(
        value.token(),
        TextToken::Unquoted(_) | TextToken::Quoted(_)
    ) {
        return Err(nested());
    }

    // Кавычки означают строку, даже если внутри число
    if matches!(value.token(), TextToken::Unquoted(_)) {
        if let Ok(number) = value.read_scalar().map_err(|_| nested())?.to_f64() {
            return Ok(ModifierValue::Number(number));
        }
    }
    value.read_string().map(ModifierValue::Text).map_err(|_| nested())
}

fn check_operator(name: &str, op: Option<Operator>) -> Result<(), SemanticError> {
    match op {
        None | Some(Operator::Equal) => Ok(()),
        Some(operator) => Err(SemanticError::UnsupportedOperator {
            name: name.to_string(),
            operator,
        }),
    }
}
