//! tabac.rs
//! Tobacco spending, cigarettes recalibrated on national sales, and the
//! tobacco price rises of the 2018 and 2019 budgets.

use super::base::yearly;
use crate::compute::{kernel, ComputationError, EntityView, Value};
use crate::parameters::ParametersAt;
use crate::periods::Period;
use crate::reform::Reform;
use crate::store::{Formula, VariableDefinition};
use chrono::NaiveDate;

pub const REFORME_TABAC_2019_IN_2017: &str = "reforme_tabac_2019_in_2017";
pub const REFORME_TABAC_2019_IN_2018: &str = "reforme_tabac_2019_in_2018";

const TAXES_TABACS: &str = "imposition_indirecte.taxes_tabacs";
const PRIX_PAQUET: &str = "imposition_indirecte.taxes_tabacs.prix_tabac.prix_paquet_cigarettes";
const PRIX_BAGUE: &str = "imposition_indirecte.taxes_tabacs.prix_tabac.prix_bague_tabac";

/// Price rises of the budgets, in force from these days.
const HAUSSES: [(&str, i32, u32); 3] = [("mars_2018", 2018, 3), ("mars_2019", 2019, 3), ("novembre_2019", 2019, 11)];

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Cigarette spending rescaled so that the weighted packs bought match the
/// national sales, valued at the pack price. Both are read at `instant`.
fn cigarettes_calibrees(
    view: &mut EntityView<'_>,
    period: Period,
    parameters: &ParametersAt<'_>,
    instant: NaiveDate,
) -> Result<Value, ComputationError> {
    let paquets = parameters.tree().number(&format!("{}.nombre_paquets_cigarettes", TAXES_TABACS), instant)?;
    let prix = parameters.tree().number(PRIX_PAQUET, instant)?;
    let depenses = view.float("depenses_cigarettes", period)?;
    let poids = view.float("pondmen", period)?;

    let total = kernel::weighted_sum(&depenses, &poids);
    if total == 0.0 {
        return Ok(Value::from(view.zeros()));
    }
    Ok(Value::from(kernel::scale(&depenses, paquets * prix / total)))
}

pub fn definitions() -> Vec<VariableDefinition> {
    vec![
        yearly("depenses_cigarettes_calibre", "Dépenses de cigarettes recalées sur les ventes nationales").formula(Formula::new(
            |view, period, parameters| cigarettes_calibrees(view, period, parameters, parameters.instant()),
        )),
        yearly("depenses_tabac", "Dépenses de tabac, cigarettes recalées").formula(Formula::new(|view, period, _| {
            let cigarettes = view.float("depenses_cigarettes_calibre", period)?;
            Ok(Value::from(kernel::add(&cigarettes, &view.float("depenses_tabac_a_rouler", period)?)))
        })),
    ]
}

/// `expense * (1 + (1 + elasticity) * (after - before) / before)` for the price at `path`.
fn apres_hausse(expense: &'static str, path: &'static str, before: NaiveDate, after: NaiveDate) -> Formula {
    Formula::new(move |view, period, parameters| {
        let avant = parameters.tree().number(path, before)?;
        let apres = parameters.tree().number(path, after)?;
        let elasticite = parameters.number(&format!("{}.elasticite_prix", TAXES_TABACS))?;
        let facteur = 1.0 + (1.0 + elasticite) * (apres - avant) / avant;
        Ok(Value::from(kernel::scale(&view.float(expense, period)?, facteur)))
    })
}

/// Yearly spending with two months at the first price, eight after March 2019
/// and two after November 2019.
fn annee_reformee(premiers_mois: [&'static str; 2]) -> Formula {
    Formula::new(move |view, period, _| {
        let mut total = view.zeros();
        for (produit, debut) in ["cigarettes", "tabac_a_rouler"].into_iter().zip(premiers_mois) {
            let mars = view.float(&format!("depenses_{}_apres_reforme_mars_2019", produit), period)?;
            let novembre = view.float(&format!("depenses_{}_apres_reforme_novembre_2019", produit), period)?;
            let debut = view.float(debut, period)?;
            let annee: Vec<f64> = (0..view.count()).map(|i| (2.0 * debut[i] + 8.0 * mars[i] + 2.0 * novembre[i]) / 12.0).collect();
            total = kernel::add(&total, &annee);
        }
        Ok(Value::from(total))
    })
}

/// Tobacco spending after the 2018 and 2019 budget rises, against the
/// situation at the end of `baseline_year` (2017 or 2018). Cigarette spending
/// is recalibrated on the sales of that year.
pub fn reforme_tabac_budgets_2018_2019(baseline_year: i32) -> Reform {
    let key = if baseline_year == 2018 { REFORME_TABAC_2019_IN_2018 } else { REFORME_TABAC_2019_IN_2017 };
    let calibration = date(baseline_year, 1, 1);
    let avant = date(baseline_year, 12, 31);

    let mut reform = Reform::new(key, "Réforme de la fiscalité du tabac prévue par les budgets 2018 et 2019").update_variable(
        yearly("depenses_cigarettes_calibre", "Dépenses de cigarettes recalées sur les ventes de l'année de référence")
            .formula(Formula::new(move |view, period, parameters| cigarettes_calibrees(view, period, parameters, calibration))),
    );
    for (hausse, year, month) in HAUSSES {
        let apres = date(year, month, 1);
        reform = reform
            .add_variable(
                yearly(&format!("depenses_cigarettes_apres_reforme_{}", hausse), "Dépenses de cigarettes après réaction à la hausse des prix")
                    .formula(apres_hausse("depenses_cigarettes_calibre", PRIX_PAQUET, avant, apres)),
            )
            .add_variable(
                yearly(&format!("depenses_tabac_a_rouler_apres_reforme_{}", hausse), "Dépenses de tabac à rouler après réaction à la hausse des prix")
                    .formula(apres_hausse("depenses_tabac_a_rouler", PRIX_BAGUE, avant, apres)),
            );
    }

    let reformee = |year| format!("depenses_reforme_tabac_2019_in_{}", year);
    let reforme_in = reformee(if baseline_year == 2018 { 2018 } else { 2017 });
    reform
        .add_variable(
            // January and February 2019 at the prices of March 2018.
            yearly(&reformee(2017), "Dépenses de tabac après les budgets 2019, par rapport à fin 2017")
                .formula(annee_reformee(["depenses_cigarettes_apres_reforme_mars_2018", "depenses_tabac_a_rouler_apres_reforme_mars_2018"])),
        )
        .add_variable(
            // January and February 2019 unreformed.
            yearly(&reformee(2018), "Dépenses de tabac après les budgets 2019, par rapport à fin 2018")
                .formula(annee_reformee(["depenses_cigarettes_calibre", "depenses_tabac_a_rouler"])),
        )
        .update_variable(yearly("depenses_tabac", "Dépenses de tabac après les budgets 2018 et 2019").formula(Formula::new(
            move |view, period, _| Ok(Value::Float(view.float(&reforme_in, period)?)),
        )))
}
