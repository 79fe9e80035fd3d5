//! French indirect taxation on energy and tobacco: survey inputs, expenditures,
//! excise and VAT, CO2 emissions, the energy cheque, and the reforms built on them.
pub mod base;
pub mod emissions;
pub mod inputs;
pub mod logement;
pub mod reforms;
pub mod revenus;
pub mod tabac;
pub mod ticpe;
pub mod transports;
pub mod tva;

use crate::parameters::{loader, ParameterError, ParameterTree};
use crate::reform::{LegislativeSystem, SystemError};
use crate::store::{RegistryError, VariableRegistry};
use std::sync::Arc;
use tracing::debug;

pub use logement::TypesContratGaz;
pub use reforms::{by_key, initializer_for, reform_keys, reinject_social_tariffs};

pub const SYSTEM_KEY: &str = "france_indirect_taxation";

const LEGISLATION: &str = include_str!("legislation.json");

/// Every variable of the catalogue.
pub fn build_registry() -> Result<VariableRegistry, RegistryError> {
    let mut registry = VariableRegistry::new();
    let definitions = inputs::definitions()
        .into_iter()
        .chain(transports::definitions())
        .chain(logement::definitions())
        .chain(ticpe::definitions())
        .chain(tva::definitions())
        .chain(revenus::definitions())
        .chain(emissions::definitions())
        .chain(tabac::definitions());
    for definition in definitions {
        registry.register(definition)?;
    }
    debug!(variables = registry.len(), "catalogue registered");
    Ok(registry)
}

/// The legislation shipped with the crate.
pub fn baseline_parameters() -> Result<ParameterTree, ParameterError> {
    loader::load_json_str(LEGISLATION)
}

pub fn tax_benefit_system() -> Result<Arc<LegislativeSystem>, SystemError> {
    Ok(Arc::new(LegislativeSystem::new(SYSTEM_KEY, build_registry()?, baseline_parameters()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Simulation;
    use crate::periods::Period;

    #[test]
    fn test_every_formula_resolves_in_2015() {
        // A household with nothing bound: defaults flow through every formula.
        let system = tax_benefit_system().unwrap();
        let names: Vec<String> = system.registry().names().map(str::to_string).collect();
        let mut sim = Simulation::new(Arc::clone(&system), 2);
        for name in &names {
            assert!(sim.calculate(name, Period::year(2015).unwrap()).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_legislation_loads_every_leaf() {
        let parameters = baseline_parameters().unwrap();
        let paths = parameters.leaf_paths();
        assert!(paths.iter().any(|p| p == "imposition_indirecte.produits_energetiques.ticpe.gazole"));
        assert!(paths.iter().all(|p| !p.ends_with("description")));
    }
}
