// Folder name -> rules, declared once at startup

use crate::countries::CountryAgreements;
use crate::investment::SeriesPivot;
use crate::tourism::VisitorsByResidence;
use crate::trade_goods::GoodsExports;
use crate::trade_services::ServicesTrade;
use crate::DomainRule;

/// Ordered `(folder, rules)` pairs.
///
/// Every folder maps to a list, even when it has a single rule, and all
/// rules of a folder run against the same files.
#[derive(Default)]
pub struct Registry {
    entries: Vec<(String, Vec<Box<dyn DomainRule>>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The production folder layout.
    pub fn standard() -> Self {
        Self::new()
            .with_folder("1-Comercio-Bienes", vec![Box::new(GoodsExports)])
            .with_folder("2-Comercio-Servicios", vec![Box::new(ServicesTrade)])
            .with_folder(
                "3-Inversion",
                vec![
                    Box::new(SeriesPivot::fdi_by_origin()),
                    Box::new(SeriesPivot::odi_by_destination()),
                ],
            )
            .with_folder("4-Turismo", vec![Box::new(VisitorsByResidence)])
            .with_folder("Ajustes", vec![Box::new(CountryAgreements)])
    }

    /// Append a folder. A later entry for the same folder is never reached
    /// by [`Registry::rules_for`].
    pub fn with_folder(mut self, folder: &str, rules: Vec<Box<dyn DomainRule>>) -> Self {
        self.entries.push((folder.to_string(), rules));
        self
    }

    pub fn rules_for(&self, folder: &str) -> Option<&[Box<dyn DomainRule>]> {
        self.entries
            .iter()
            .find(|(name, _)| name == folder)
            .map(|(_, rules)| rules.as_slice())
    }

    pub fn folders(&self) -> impl Iterator<Item = (&str, &[Box<dyn DomainRule>])> {
        self.entries
            .iter()
            .map(|(name, rules)| (name.as_str(), rules.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
