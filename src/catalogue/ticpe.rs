//! ticpe.rs
//! Excise on energy products (TICPE) paid by households on fuels and heating oil.

use super::base::{excise_on_expense, excise_with_majoration, jan1, sum_of, yearly, MAJORATION_GAZOLE, MAJORATION_SUPER, PRIX_CARBURANTS, TICPE};
use crate::compute::{kernel, Value};
use crate::store::{Formula, VariableDefinition};

/// TICPE on the expense `expense`, taxed at `excise` (plus the regional
/// majoration when given) and sold at `price`.
fn fuel_excise(expense: &'static str, excise: &'static str, majoration: Option<&'static str>, price: &'static str) -> Formula {
    Formula::new(move |view, period, parameters| {
        let excise_path = format!("{}.{}", TICPE, excise);
        let accise = match majoration {
            Some(majoration) => excise_with_majoration(parameters, &excise_path, majoration)?,
            None => parameters.number(&excise_path)?,
        };
        let price_path = format!("{}.{}", PRIX_CARBURANTS, price);
        excise_on_expense(view, period, parameters, expense, accise, &price_path)
    })
}

pub fn definitions() -> Vec<VariableDefinition> {
    vec![
        yearly("diesel_ticpe", "Montant de TICPE sur le gazole")
            .formula(fuel_excise("depenses_diesel", "gazole", Some(MAJORATION_GAZOLE), "diesel_ttc")),
        yearly("sp95_ticpe", "Montant de TICPE sur le SP95")
            .formula(fuel_excise("depenses_sp_95", "super_95_98", Some(MAJORATION_SUPER), "super_95_ttc")),
        yearly("sp98_ticpe", "Montant de TICPE sur le SP98")
            .formula(fuel_excise("depenses_sp_98", "super_95_98", Some(MAJORATION_SUPER), "super_98_ttc")),
        yearly("sp_e10_ticpe", "Montant de TICPE sur le SP95-E10")
            .formula(fuel_excise("depenses_sp_e10", "super_e10", Some(MAJORATION_SUPER), "super_95_e10_ttc").starting(jan1(2009))),
        yearly("super_plombe_ticpe", "Montant de TICPE sur le super plombé")
            .formula(fuel_excise("depenses_super_plombe", "super_plombe", None, "super_plombe_ttc").until(jan1(2007))),
        yearly("essence_ticpe", "Montant de TICPE sur toutes les essences")
            .formula(sum_of(&["sp95_ticpe", "sp98_ticpe", "super_plombe_ticpe"]).starting(jan1(1990)).until(jan1(2007)))
            .formula(sum_of(&["sp95_ticpe", "sp98_ticpe"]).starting(jan1(2007)).until(jan1(2009)))
            .formula(sum_of(&["sp95_ticpe", "sp98_ticpe", "sp_e10_ticpe"]).starting(jan1(2009))),
        yearly("ticpe_totale", "Montant de TICPE sur tous les carburants").formula(sum_of(&["diesel_ticpe", "essence_ticpe"])),
        yearly("combustibles_liquides_ticpe", "Montant de TICPE sur les combustibles liquides").formula(Formula::new(|view, period, parameters| {
            let accise = parameters.number(&format!("{}.gazole_fioul_domestique_hectolitre", TICPE))?;
            Ok(Value::from(kernel::scale(&view.float("quantites_combustibles_liquides", period)?, accise / 100.0)))
        })),
        yearly("total_taxes_energies", "Montant de TICPE sur les carburants et les combustibles")
            .formula(sum_of(&["diesel_ticpe", "essence_ticpe", "combustibles_liquides_ticpe"])),
        // Quantity-based variant, for households described by litres bought.
        yearly("ticpe_diesel", "Montant de TICPE sur une quantité de gazole (hectolitres)").formula(Formula::new(|view, period, parameters| {
            let accise = parameters.number(&format!("{}.gazole", TICPE))?;
            Ok(Value::from(kernel::scale(&view.float("diesel_quantite", period)?, accise)))
        })),
    ]
}
