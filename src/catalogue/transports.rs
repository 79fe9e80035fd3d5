//! transports.rs
//! Fuel expenditures: the diesel/petrol split of the survey fuel item, the
//! response to price changes, and the split of petrol by grade.

use super::base::{price_adjusted_expense, share_of, sum_of, tax_from_expense_including_tax, yearly, PART_SUPERCARBURANTS, PRIX_CARBURANTS, TAUX_NORMAL_TVA};
use crate::compute::{kernel, Value};
use crate::store::{Formula, VariableDefinition};

fn poste_diesel() -> Formula {
    Formula::new(|view, period, parameters| {
        let conso_diesel = parameters.number("quantite_carbu_vp.diesel")?;
        let conso_essence = parameters.number("quantite_carbu_vp.essence")?;
        let conso_moyenne_diesel = conso_diesel / parameters.number("parc_vp.diesel")?;
        let conso_moyenne_essence = conso_essence / parameters.number("parc_vp.essence")?;
        let part_nationale = conso_diesel / (conso_diesel + conso_essence);

        let veh_diesel = view.float("veh_diesel", period)?;
        let veh_essence = view.float("veh_essence", period)?;
        let poste_carburants = view.float("poste_carburants", period)?;

        // Households without a vehicle get the national diesel share of car fuel.
        let poste: Vec<f64> = poste_carburants.iter().zip(veh_diesel.iter().zip(veh_essence.iter()))
            .map(|(&depense, (&diesel, &essence))| {
                let part = if diesel + essence == 0.0 {
                    part_nationale
                } else {
                    let conso = diesel * conso_moyenne_diesel;
                    conso / (conso + essence * conso_moyenne_essence)
                };
                depense * part
            })
            .collect();
        Ok(Value::from(poste))
    })
}

pub fn definitions() -> Vec<VariableDefinition> {
    vec![
        yearly("poste_diesel", "Dépenses en gazole, par pondération du parc de véhicules").formula(poste_diesel()),
        yearly("poste_essence", "Dépenses en essence, par déduction du gazole").formula(Formula::new(|view, period, _| {
            let total = view.float("poste_carburants", period)?;
            Ok(Value::from(kernel::sub(&total, &view.float("poste_diesel", period)?)))
        })),
        yearly("depenses_diesel", "Dépenses en gazole après réponse à l'évolution des prix").formula(Formula::new(|view, period, parameters| {
            price_adjusted_expense(view, period, parameters, "poste_diesel", "elas_price_1_1", "prix_carburants.diesel_ttc")
        })),
        yearly("depenses_essence", "Dépenses en essence après réponse à l'évolution des prix").formula(Formula::new(|view, period, parameters| {
            price_adjusted_expense(view, period, parameters, "poste_essence", "elas_price_1_1", "prix_carburants.super_95_ttc")
        })),
        yearly("depenses_carburants", "Dépenses en carburants").formula(sum_of(&["depenses_diesel", "depenses_essence"])),
        yearly("depenses_diesel_htva", "Dépenses en gazole hors TVA, TICPE incluse").formula(Formula::new(|view, period, parameters| {
            let vat = parameters.number(TAUX_NORMAL_TVA)?;
            let depenses = view.float("depenses_diesel", period)?;
            Ok(Value::from(kernel::sub(&depenses, &tax_from_expense_including_tax(&depenses, vat))))
        })),
        yearly("depenses_sp_95", "Dépenses en SP95").formula(share_of("depenses_essence", format!("{}.sp_95", PART_SUPERCARBURANTS))),
        yearly("depenses_sp_98", "Dépenses en SP98").formula(share_of("depenses_essence", format!("{}.sp_98", PART_SUPERCARBURANTS))),
        yearly("depenses_sp_e10", "Dépenses en SP95-E10").formula(share_of("depenses_essence", format!("{}.sp_e10", PART_SUPERCARBURANTS))),
        yearly("depenses_super_plombe", "Dépenses en super plombé").formula(share_of("depenses_essence", format!("{}.super_plombe", PART_SUPERCARBURANTS))),
        // Prices are per hectolitre.
        yearly("quantites_diesel", "Quantités de gazole consommées (litres)").formula(Formula::new(|view, period, parameters| {
            let prix = parameters.number(&format!("{}.diesel_ttc", PRIX_CARBURANTS))?;
            Ok(Value::from(kernel::scale(&view.float("depenses_diesel", period)?, 100.0 / prix)))
        })),
        // Petrol is valued at the SP95 pump price, whatever the grade.
        yearly("quantites_essence", "Quantités d'essence consommées (litres)").formula(Formula::new(|view, period, parameters| {
            let prix = parameters.number(&format!("{}.super_95_ttc", PRIX_CARBURANTS))?;
            Ok(Value::from(kernel::scale(&view.float("depenses_essence", period)?, 100.0 / prix)))
        })),
    ]
}
