//! base.rs
//! Parameter paths and tax arithmetic shared by the energy variables.

use crate::compute::{kernel, ComputationError, EntityView, Value};
use crate::parameters::{ParameterError, ParametersAt};
use crate::periods::{Period, PeriodUnit};
use crate::store::{Formula, PeriodPolicy, VariableDefinition};
use chrono::NaiveDate;

pub const TAUX_NORMAL_TVA: &str = "imposition_indirecte.tva.taux_de_tva.taux_normal";
pub const TICPE: &str = "imposition_indirecte.produits_energetiques.ticpe";
pub const MAJORATION_GAZOLE: &str = "imposition_indirecte.produits_energetiques.major_regionale_ticpe_gazole.alsace";
pub const MAJORATION_SUPER: &str = "imposition_indirecte.produits_energetiques.major_regionale_ticpe_super.alsace";
pub const PART_SUPERCARBURANTS: &str = "imposition_indirecte.part_type_supercarburants";
pub const PRIX_CARBURANTS: &str = "prix_carburants";
pub const PRIX_FIOUL: &str = "tarifs_energie.prix_fioul_domestique.prix_ttc_2000_4999_litres";
pub const PRIX_UNITAIRE_GAZ: &str = "tarifs_energie.tarifs_reglementes_gdf.prix_unitaire_gdf_ttc";
pub const TARIF_FIXE_GAZ: &str = "tarifs_energie.tarifs_reglementes_gdf.tarif_fixe_gdf_ttc";
pub const PRIX_KWH_ELECTRICITE: &str = "tarifs_energie.tarifs_reglementes_edf.prix_kwh_base_ttc";
pub const EMISSIONS_CO2: &str = "imposition_indirecte.emissions_CO2";

/// First day of `year`; legislative windows open on January 1st.
pub fn jan1(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Reference prices are named after the price they freeze.
pub fn reference_path(price_path: &str) -> String { format!("{}_reference", price_path) }

/// Tax included in an expense paid at `rate`: `expense * rate / (1 + rate)`.
pub fn tax_from_expense_including_tax(expense: &[f64], rate: f64) -> Vec<f64> {
    kernel::scale(expense, rate / (1.0 + rate))
}

/// Excise expressed as a rate on the price net of VAT and excise.
pub fn implicit_rate(excise: f64, vat: f64, price_including_tax: f64) -> f64 {
    let excise_with_vat = excise * (1.0 + vat);
    excise_with_vat / (price_including_tax - excise_with_vat)
}

/// The excise at `excise_path`, raised by the regional majoration when one is in force.
pub fn excise_with_majoration(parameters: &ParametersAt<'_>, excise_path: &str, majoration_path: &str) -> Result<f64, ParameterError> {
    let excise = parameters.number(excise_path)?;
    Ok(match parameters.number_if_defined(majoration_path)? {
        Some(majoration) => excise + majoration,
        None => excise,
    })
}

/// Excise paid on a fuel expense, through the implicit rate of the fuel price.
pub fn excise_on_expense(
    view: &mut EntityView<'_>,
    period: Period,
    parameters: &ParametersAt<'_>,
    expense: &str,
    excise: f64,
    price_path: &str,
) -> Result<Value, ComputationError> {
    let vat = parameters.number(TAUX_NORMAL_TVA)?;
    let rate = implicit_rate(excise, vat, parameters.number(price_path)?);
    let expenses = view.float(expense, period)?;
    let net_of_vat = kernel::sub(&expenses, &tax_from_expense_including_tax(&expenses, vat));
    Ok(Value::from(tax_from_expense_including_tax(&net_of_vat, rate)))
}

/// Expense after the response to a price moved away from its reference:
/// `expense * (1 + (1 + elasticity) * delta / reference)`. The expense is kept
/// when the legislation defines no reference price or the price is unchanged.
pub fn price_adjusted_expense(
    view: &mut EntityView<'_>,
    period: Period,
    parameters: &ParametersAt<'_>,
    expense: &str,
    elasticity: &str,
    price_path: &str,
) -> Result<Value, ComputationError> {
    let expenses = view.float(expense, period)?;
    let Some(reference) = parameters.number_if_defined(&reference_path(price_path))? else {
        return Ok(Value::Float(expenses));
    };
    let delta = parameters.number(price_path)? - reference;
    if delta == 0.0 {
        return Ok(Value::Float(expenses));
    }
    let elasticities = view.float(elasticity, period)?;
    let adjusted: Vec<f64> = expenses.iter().zip(elasticities.iter())
        .map(|(d, e)| d * (1.0 + (1.0 + e) * delta / reference))
        .collect();
    Ok(Value::from(adjusted))
}

/// `alpha * expense`, with `alpha` read from the parameters.
pub fn share_of(expense: &'static str, share_path: String) -> Formula {
    Formula::new(move |view, period, parameters| {
        let share = parameters.number(&share_path)?;
        Ok(Value::from(kernel::scale(&view.float(expense, period)?, share)))
    })
}

/// Sum of the given variables over the same period.
pub fn sum_of(names: &'static [&'static str]) -> Formula {
    Formula::new(move |view, period, _| {
        let mut total = view.zeros();
        for name in names {
            total = kernel::add(&total, &view.float(name, period)?);
        }
        Ok(Value::from(total))
    })
}

/// A yearly household amount; sub-periods get their pro-rata share.
pub fn yearly(name: &str, label: &str) -> VariableDefinition {
    VariableDefinition::float(name, PeriodUnit::Year).label(label).policy(PeriodPolicy::Divide)
}
