//! emissions.rs
//! CO2 emitted by household energy consumption, from the physical quantities
//! and the emission factors of the legislation (Ademe, Base Carbone).

use super::base::{sum_of, yearly, EMISSIONS_CO2};
use crate::compute::{kernel, Value};
use crate::store::{Formula, VariableDefinition};

/// `quantity * factor`, the factor read under `emissions_CO2`.
fn emitted(quantity: &'static str, factor: &'static str) -> Formula {
    Formula::new(move |view, period, parameters| {
        let factor = parameters.number(&format!("{}.{}", EMISSIONS_CO2, factor))?;
        Ok(Value::from(kernel::scale(&view.float(quantity, period)?, factor)))
    })
}

pub fn definitions() -> Vec<VariableDefinition> {
    vec![
        yearly("emissions_CO2_carburants", "Émissions de CO2 des carburants du ménage (kg)").formula(Formula::new(|view, period, parameters| {
            let diesel = parameters.number(&format!("{}.carburants.CO2_diesel", EMISSIONS_CO2))?;
            let essence = parameters.number(&format!("{}.carburants.CO2_essence", EMISSIONS_CO2))?;
            let emissions = kernel::add(
                &kernel::scale(&view.float("quantites_diesel", period)?, diesel),
                &kernel::scale(&view.float("quantites_essence", period)?, essence),
            );
            Ok(Value::from(emissions))
        })),
        yearly("emissions_CO2_gaz", "Émissions de CO2 du gaz de ville (kg)")
            .formula(emitted("quantites_gaz", "energie_logement.CO2_gaz_ville")),
        yearly("emissions_CO2_electricite", "Émissions de CO2 de l'électricité (kg)")
            .formula(emitted("quantites_electricite", "energie_logement.CO2_electricite")),
        yearly("emissions_CO2_combustibles_liquides", "Émissions de CO2 des combustibles liquides (kg)")
            .formula(emitted("quantites_combustibles_liquides", "energie_logement.CO2_combustibles_liquides")),
        yearly("emissions_CO2_energies_logement", "Émissions de CO2 des énergies du logement (kg)").formula(sum_of(&[
            "emissions_CO2_electricite",
            "emissions_CO2_gaz",
            "emissions_CO2_combustibles_liquides",
        ])),
        yearly("emissions_CO2_energies_totales", "Émissions de CO2 des énergies du logement et des carburants (kg)")
            .formula(sum_of(&["emissions_CO2_energies_logement", "emissions_CO2_carburants"])),
    ]
}

#[cfg(test)]
mod tests {
    use crate::catalogue::tax_benefit_system;
    use crate::compute::{Simulation, Value};
    use crate::periods::Period;

    #[test]
    fn test_emissions_by_energy() {
        let year = Period::year(2015).unwrap();
        let mut sim = Simulation::new(tax_benefit_system().unwrap(), 2);
        // 1000 l of diesel, 500 l of petrol, 1000 l of heating oil, 10 MWh of each of gas and power.
        sim.set_input("depenses_diesel", year, Value::from(vec![1140.0, 0.0])).unwrap();
        sim.set_input("depenses_essence", year, Value::from(vec![683.0, 0.0])).unwrap();
        sim.set_input("depenses_combustibles_liquides", year, Value::from(vec![730.0, 0.0])).unwrap();
        sim.set_input("quantites_gaz", year, Value::from(vec![10000.0, 0.0])).unwrap();
        sim.set_input("depenses_electricite", year, Value::from(vec![1472.0, 0.0])).unwrap();

        let mut close = |name: &str, expected: f64| {
            let value = sim.calculate_float(name, year).unwrap();
            assert!((value[0] - expected).abs() < 1e-6, "{}: {}", name, value[0]);
            assert_eq!(value[1], 0.0, "{}", name);
        };
        close("emissions_CO2_carburants", 2660.0 + 1210.0);
        close("emissions_CO2_combustibles_liquides", 3240.0);
        close("emissions_CO2_gaz", 2410.0);
        close("emissions_CO2_electricite", 900.0);
        close("emissions_CO2_energies_logement", 6550.0);
        close("emissions_CO2_energies_totales", 10420.0);
    }
}
