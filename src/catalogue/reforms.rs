//! reforms.rs
//! Energy-taxation reforms, every catalogue reform by key, and the initializer
//! re-injecting the social tariffs the energy reforms abolish.

use super::base::{jan1, reference_path, sum_of, yearly, EMISSIONS_CO2, PRIX_CARBURANTS, PRIX_FIOUL, PRIX_UNITAIRE_GAZ, TAUX_NORMAL_TVA, TICPE};
use super::logement::TypesContratGaz;
use super::revenus::cheque_energie;
use super::tabac::{reforme_tabac_budgets_2018_2019, REFORME_TABAC_2019_IN_2017, REFORME_TABAC_2019_IN_2018};
use crate::compute::{kernel, ComputationError, Simulation, Value};
use crate::parameters::{Parameter, ParameterEntry, ParameterError, ParameterNode, ParameterTree};
use crate::periods::Period;
use crate::reform::Reform;
use crate::scenario::Initializer;
use crate::store::{Category, Formula, VariableDefinition};
use chrono::NaiveDate;
use tracing::debug;

pub const OFFICIELLE_2019_IN_2017: &str = "officielle_2019_in_2017";
pub const RATTRAPAGE_DIESEL: &str = "rattrapage_diesel";
pub const SUPPRESSION_TARIFS_SOCIAUX: &str = "suppression_tarifs_sociaux";

const FUEL_PRICES: [&str; 5] = ["diesel_ttc", "super_95_ttc", "super_98_ttc", "super_95_e10_ttc", "super_plombe_ttc"];

/// Carbon component of 2019 (44.6 €/tCO2) against the 2017 one (30.5 €/tCO2), in €/kgCO2.
const HAUSSE_COMPOSANTE_CARBONE: f64 = 0.0446 - 0.0305;


/// Convergence step of the diesel excise on petrol, in euros per hectolitre.
const RATTRAPAGE_DIESEL_PATH: &str = "rattrapage_diesel.diesel";
const RATTRAPAGE_DIESEL_2016: f64 = 2.6;

pub fn reform_keys() -> [&'static str; 5] {
    [OFFICIELLE_2019_IN_2017, RATTRAPAGE_DIESEL, SUPPRESSION_TARIFS_SOCIAUX, REFORME_TABAC_2019_IN_2017, REFORME_TABAC_2019_IN_2018]
}

pub fn by_key(key: &str) -> Option<Reform> {
    match key {
        OFFICIELLE_2019_IN_2017 => Some(officielle_2019_in_2017()),
        RATTRAPAGE_DIESEL => Some(rattrapage_diesel()),
        SUPPRESSION_TARIFS_SOCIAUX => Some(suppression_tarifs_sociaux()),
        REFORME_TABAC_2019_IN_2017 => Some(reforme_tabac_budgets_2018_2019(2017)),
        REFORME_TABAC_2019_IN_2018 => Some(reforme_tabac_budgets_2018_2019(2018)),
        _ => None,
    }
}

/// The initializer a reform needs once its survey is bound, if any.
pub fn initializer_for(key: &str) -> Option<&'static Initializer> {
    match key {
        OFFICIELLE_2019_IN_2017 | SUPPRESSION_TARIFS_SOCIAUX => Some(&reinject_social_tariffs as &Initializer),
        _ => None,
    }
}

/// Abolished gas social tariffs are paid by the household again: the baseline
/// tariff is added to the variable gas expense of the reformed simulation.
pub fn reinject_social_tariffs(simulation: &mut Simulation, baseline: Option<&mut Simulation>, period: Period) -> Result<(), ComputationError> {
    let neutralized = simulation.registry().get("tarifs_sociaux_gaz").is_ok_and(|d| d.is_neutralized);
    let Some(baseline) = baseline else { return Ok(()) };
    if !neutralized {
        return Ok(());
    }
    let tarifs_sociaux = baseline.calculate_float("tarifs_sociaux_gaz", period)?;
    let variables = baseline.calculate_float("depenses_gaz_variables", period)?;
    debug!(%period, "social gas tariffs re-injected into variable gas expense");
    simulation.set_input("depenses_gaz_variables", period, Value::from(kernel::add(&tarifs_sociaux, &variables)))
}

/// Copies every price the reform moves under `<price>_reference`, so the
/// expenditures can respond to the gap.
fn with_reference_prices(tree: &ParameterTree) -> Result<ParameterTree, ParameterError> {
    let mut prices: Vec<String> = FUEL_PRICES.iter().map(|p| format!("{}.{}", PRIX_CARBURANTS, p)).collect();
    prices.push(PRIX_FIOUL.to_string());
    prices.extend(TypesContratGaz::CONTRATS.iter().filter_map(|c| c.prix_unitaire_path()));

    let mut out = tree.clone();
    for price in prices {
        let node = tree.node(&price)?.clone();
        out = out.with_child(&reference_path(&price), node)?;
    }
    Ok(out)
}

/// Adds `increment(date)` to every value of the leaf in force from `start` onward.
fn shifted_from(
    tree: &ParameterTree,
    path: &str,
    start: NaiveDate,
    increment: impl Fn(NaiveDate) -> Result<f64, ParameterError>,
) -> Result<ParameterTree, ParameterError> {
    let ParameterNode::Leaf(leaf) = tree.node(path)? else {
        return Err(ParameterError::NotALeaf { path: path.to_string() });
    };
    let mut entries: Vec<ParameterEntry> = leaf.entries().iter().filter(|e| e.start < start).cloned().collect();
    if !leaf.entries().iter().any(|e| e.start == start) {
        if let Some(in_force) = leaf.value_at(start) {
            entries.push(ParameterEntry::new(start, in_force.clone()));
        }
    }
    entries.extend(leaf.entries().iter().filter(|e| e.start >= start).cloned());

    for entry in entries.iter_mut().filter(|e| e.start >= start) {
        if let Some(value) = entry.value.as_number() {
            entry.value = (value + increment(entry.start)?).into();
        }
    }
    let mut shifted = Parameter::new(entries).map_err(|reason| ParameterError::InvalidEntries { path: path.to_string(), reason })?;
    shifted.description = leaf.description.clone();
    tree.with_child(path, ParameterNode::leaf(shifted))
}

fn carbon_prices_2019(tree: &ParameterTree) -> Result<ParameterTree, ParameterError> {
    let start = jan1(2017);
    // Emission factors are in kgCO2 per litre of fuel and per kWh of gas.
    let facteur = |name: &str| tree.number(&format!("{}.{}", EMISSIONS_CO2, name), start);
    let contenu_diesel = 100.0 * facteur("carburants.CO2_diesel")?;
    let contenu_essence = 100.0 * facteur("carburants.CO2_essence")?;
    let contenu_fioul = facteur("energie_logement.CO2_combustibles_liquides")?;
    let contenu_gaz = facteur("energie_logement.CO2_gaz_ville")?;

    // 1. Freeze the current prices as references
    let mut tree = with_reference_prices(tree)?;

    // 2. Raise them by the carbon content of each energy
    let diesel = format!("{}.diesel_ttc", PRIX_CARBURANTS);
    let reference = tree.number(&reference_path(&diesel), start)?;
    tree = tree.with_value_update(&diesel, start, reference + RATTRAPAGE_DIESEL_2016 + contenu_diesel * HAUSSE_COMPOSANTE_CARBONE)?;

    let essence = format!("{}.super_95_ttc", PRIX_CARBURANTS);
    let reference = tree.number(&reference_path(&essence), start)?;
    tree = tree.with_value_update(&essence, start, reference + contenu_essence * HAUSSE_COMPOSANTE_CARBONE)?;

    let reference = tree.number(&reference_path(PRIX_FIOUL), start)?;
    tree = tree.with_value_update(PRIX_FIOUL, start, reference + contenu_fioul * HAUSSE_COMPOSANTE_CARBONE)?;

    // The heating-oil excise is per hectolitre.
    let fioul_ticpe = format!("{}.gazole_fioul_domestique_hectolitre", TICPE);
    let current = tree.number(&fioul_ticpe, start)?;
    tree = tree.with_value_update(&fioul_ticpe, start, current + 100.0 * contenu_fioul * HAUSSE_COMPOSANTE_CARBONE)?;

    for contrat in TypesContratGaz::CONTRATS {
        let Some(prix) = contrat.prix_unitaire_path() else { continue };
        let reference = tree.number(&reference_path(&prix), start)?;
        tree = tree.with_value_update(&prix, start, reference + contenu_gaz * HAUSSE_COMPOSANTE_CARBONE)?;
    }

    // 3. The energy cheque of the 2019 law, read under its own name
    let cheque = tree.node("prestations.cheque_energie")?.clone();
    tree.with_child("prestations.cheque_energie_reforme", cheque)
}

/// Gas spending always responds to the gap between the contract price and its reference.
fn depenses_gaz_ville_reponse_prix() -> VariableDefinition {
    yearly("depenses_gaz_ville", "Dépenses en gaz après réaction à la hausse de la composante carbone").formula(Formula::new(|view, period, parameters| {
        let mut deltas = [0.0; 5];
        for contrat in TypesContratGaz::CONTRATS {
            let Some(prix) = contrat.prix_unitaire_path() else { continue };
            deltas[contrat.code() as usize] = parameters.number(&prix)? - parameters.number(&reference_path(&prix))?;
        }
        let variables = view.float("depenses_gaz_variables", period)?;
        let tarif_fixe = view.float("depenses_gaz_tarif_fixe", period)?;
        let prix_unitaire = view.float("depenses_gaz_prix_unitaire", period)?;
        let elasticites = view.float("elas_price_2_2", period)?;
        let contrats = view.categories::<TypesContratGaz>("depenses_gaz_contrat", period)?;

        // Without a contract the unit price is zero and the ratio is undefined.
        let mut ajustees: Vec<f64> = (0..view.count())
            .map(|i| variables[i] * (1.0 + (1.0 + elasticites[i]) * deltas[contrats[i].code() as usize] / prix_unitaire[i]))
            .collect();
        kernel::sanitize(&mut ajustees);
        Ok(Value::from(kernel::add(&ajustees, &tarif_fixe)))
    }))
}

pub fn officielle_2019_in_2017() -> Reform {
    Reform::new(OFFICIELLE_2019_IN_2017, "Réforme de la fiscalité des énergies de 2018 par rapport aux taux de 2016")
        .neutralize_variable("tarifs_sociaux_gaz")
        .neutralize_variable("tarifs_sociaux_electricite")
        .update_variable(yearly("cheques_energie", "Montant des chèques énergie tels que prévus par la loi").formula(Formula::new(
            |view, period, parameters| cheque_energie(view, period, parameters, "prestations.cheque_energie_reforme"),
        )))
        .update_variable(yearly("depenses_energies_logement", "Dépenses en énergies dans le logement après la réforme").formula(sum_of(&[
            "depenses_combustibles_liquides",
            "depenses_combustibles_solides",
            "depenses_electricite",
            "depenses_energie_thermique",
            "depenses_gaz_liquefie",
            "depenses_gaz_ville",
            "tarifs_sociaux_electricite",
        ])))
        .update_variable(depenses_gaz_ville_reponse_prix())
        .add_variable(yearly("taxe_gaz_ville_additionnelle", "Recettes de la taxe sur la consommation de gaz, à consommation inchangée").formula(
            Formula::new(|view, period, parameters| {
                let prix = format!("{}.prix_kwh_base_ttc", PRIX_UNITAIRE_GAZ);
                let hausse = parameters.number(&prix)? - parameters.number(&reference_path(&prix))?;
                Ok(Value::from(kernel::scale(&view.float("quantites_gaz", period)?, hausse)))
            }),
        ))
        .update_variable(yearly("total_taxes_energies", "Contributions aux taxes sur l'énergie après la réforme").formula(sum_of(&[
            "diesel_ticpe",
            "essence_ticpe",
            "combustibles_liquides_ticpe",
            "taxe_gaz_ville_additionnelle",
        ])))
        .modify_parameters(carbon_prices_2019)
}

/// Diesel excise raised towards petrol from 2016, the pump price passing the
/// increase on with VAT, and diesel spending responding through its elasticity.
pub fn rattrapage_diesel() -> Reform {
    Reform::new(RATTRAPAGE_DIESEL, "Rattrapage de la fiscalité du gazole sur celle de l'essence")
        .modify_parameters(|tree| {
            let start = jan1(2016);
            let step = Parameter::new(vec![ParameterEntry::new(start, RATTRAPAGE_DIESEL_2016)])
                .map_err(|reason| ParameterError::InvalidEntries { path: RATTRAPAGE_DIESEL_PATH.to_string(), reason })?
                .with_description("Hausse de l'accise sur le gazole (euros par hectolitre)");
            let tree = tree.with_child(RATTRAPAGE_DIESEL_PATH, ParameterNode::leaf(step))?;

            let tree = shifted_from(&tree, &format!("{}.gazole", TICPE), start, |date| tree.number(RATTRAPAGE_DIESEL_PATH, date))?;
            let base = &tree;
            shifted_from(base, &format!("{}.diesel_ttc", PRIX_CARBURANTS), start, |date| {
                Ok(base.number(RATTRAPAGE_DIESEL_PATH, date)? * (1.0 + base.number(TAUX_NORMAL_TVA, date)?))
            })
        })
        .based_on_baseline("depenses_diesel", |baseline, view, period, parameters| {
            let depenses = baseline.call(view, period, parameters)?.to_f64();
            let Some(hausse) = parameters.number_if_defined(RATTRAPAGE_DIESEL_PATH)? else {
                return Ok(Value::Float(depenses));
            };
            let hausse_ttc = hausse * (1.0 + parameters.number(TAUX_NORMAL_TVA)?);
            let prix_avant = parameters.number(&format!("{}.diesel_ttc", PRIX_CARBURANTS))? - hausse_ttc;
            let elasticites = view.float("elas_price_1_1", period)?;
            Ok(Value::from(
                depenses.iter().zip(elasticites.iter())
                    .map(|(&d, &e)| d * (1.0 + (1.0 + e) * hausse_ttc / prix_avant))
                    .collect::<Vec<_>>(),
            ))
        })
}

pub fn suppression_tarifs_sociaux() -> Reform {
    Reform::new(SUPPRESSION_TARIFS_SOCIAUX, "Suppression des tarifs sociaux du gaz et de l'électricité")
        .neutralize_variable("tarifs_sociaux_gaz")
        .neutralize_variable("tarifs_sociaux_electricite")
}
