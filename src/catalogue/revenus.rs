//! revenus.rs
//! Living standard, its weighted deciles, energy effort and the energy cheque.

use super::base::{jan1, yearly};
use crate::compute::{kernel, ComputationError, EntityView, Value};
use crate::parameters::ParametersAt;
use crate::periods::{Period, PeriodUnit};
use crate::store::{Formula, ValueType, VariableDefinition};

/// Decile (1 to 10) of each household in the weighted distribution of `values`.
/// Households sharing a value share a decile.
pub fn weighted_deciles(values: &[f64], weights: &[f64]) -> Vec<i64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return vec![1; values.len()];
    }
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut deciles = vec![1; values.len()];
    let mut cumulated = 0.0;
    let mut i = 0;
    while i < order.len() {
        // Weight of the whole tie group before assigning it.
        let mut j = i;
        while j < order.len() && values[order[j]] == values[order[i]] {
            cumulated += weights[order[j]];
            j += 1;
        }
        let decile = ((cumulated / total) * 10.0 - 1e-9).ceil().clamp(1.0, 10.0) as i64;
        for &k in &order[i..j] {
            deciles[k] = decile;
        }
        i = j;
    }
    deciles
}

/// The energy cheque of a household with `uc` consumption units and
/// `revenu_uc` taxable income per unit, read on the scales under `bareme`.
pub fn cheque_energie(
    view: &mut EntityView<'_>,
    period: Period,
    parameters: &ParametersAt<'_>,
    bareme: &str,
) -> Result<Value, ComputationError> {
    let ratio = parameters.number(&format!("{}.ratio_revenu_disponible_revenu_fiscal", bareme))?;
    let un_uc = parameters.scale(&format!("{}.menage_avec_1_uc", bareme))?;
    let entre_1_et_2 = parameters.scale(&format!("{}.menage_entre_1_et_2_uc", bareme))?;
    let deux_uc_et_plus = parameters.scale(&format!("{}.menage_avec_2_uc_et_plus", bareme))?;

    let revdecm = view.float("revdecm", period)?;
    let ocde10 = view.float("ocde10", period)?;
    let revenu_uc: Vec<f64> = revdecm.iter().zip(ocde10.iter())
        .map(|(&r, &uc)| (r / ratio).max(0.0) / uc)
        .collect();

    let montants = [un_uc.calc(&revenu_uc), entre_1_et_2.calc(&revenu_uc), deux_uc_et_plus.calc(&revenu_uc)];
    let cheques: Vec<f64> = ocde10.iter().enumerate()
        .map(|(i, &uc)| match uc {
            uc if uc == 1.0 => montants[0][i],
            uc if uc > 1.0 && uc < 2.0 => montants[1][i],
            uc if uc >= 2.0 => montants[2][i],
            _ => 0.0,
        })
        .collect();
    Ok(Value::from(cheques))
}

pub fn definitions() -> Vec<VariableDefinition> {
    vec![
        yearly("niveau_de_vie", "Revenu disponible par unité de consommation").formula(Formula::new(|view, period, _| {
            let revenu = view.float("rev_disponible", period)?;
            Ok(Value::from(kernel::safe_div(&revenu, &view.float("ocde10", period)?)))
        })),
        VariableDefinition::new("niveau_vie_decile", ValueType::Int, PeriodUnit::Year)
            .label("Décile de niveau de vie")
            .formula(Formula::new(|view, period, _| {
                let niveau_de_vie = view.float("niveau_de_vie", period)?;
                let poids = view.float("pondmen", period)?;
                Ok(Value::from(weighted_deciles(&niveau_de_vie, &poids)))
            })),
        yearly("taux_effort_energetique", "Part des dépenses d'énergie du logement dans le revenu disponible").formula(Formula::new(|view, period, _| {
            let depenses = view.float("depenses_energies_logement", period)?;
            Ok(Value::from(kernel::safe_div(&depenses, &view.float("rev_disponible", period)?)))
        })),
        VariableDefinition::new("precarite_energetique", ValueType::Bool, PeriodUnit::Year)
            .label("Ménage modeste consacrant une part élevée de son revenu à l'énergie du logement")
            .formula(Formula::new(|view, period, parameters| {
                let seuil = parameters.number("precarite_energetique.seuil_taux_effort")?;
                let decile_maximal = parameters.number("precarite_energetique.decile_maximal")? as i64;
                let taux = view.float("taux_effort_energetique", period)?;
                let deciles = view.calculate("niveau_vie_decile", period)?;
                let deciles = deciles.as_int().ok_or_else(|| view.arithmetic_error("niveau_vie_decile is not an integer column"))?;
                Ok(Value::from(taux.iter().zip(deciles.iter()).map(|(&t, &d)| t > seuil && d <= decile_maximal).collect::<Vec<_>>()))
            })),
        yearly("cheques_energie", "Montant des chèques énergie").formula(
            Formula::new(|view, period, parameters| cheque_energie(view, period, parameters, "prestations.cheque_energie")).starting(jan1(2018)),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::tax_benefit_system;
    use crate::compute::Simulation;

    #[test]
    fn test_weighted_deciles() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        assert_eq!(weighted_deciles(&values, &[1.0; 10]), (1..=10).collect::<Vec<i64>>());
        // The heavy household covers the first half of the population.
        assert_eq!(weighted_deciles(&[1.0, 2.0, 3.0], &[5.0, 2.5, 2.5]), vec![5, 8, 10]);
        assert_eq!(weighted_deciles(&[4.0, 4.0], &[1.0, 1.0]), vec![10, 10]);
        assert_eq!(weighted_deciles(&[4.0, 2.0], &[0.0, 0.0]), vec![1, 1]);
    }

    #[test]
    fn test_cheque_energie_by_consumption_units() {
        let year = Period::year(2018).unwrap();
        let mut sim = Simulation::new(tax_benefit_system().unwrap(), 4);
        sim.set_input("revdecm", year, Value::from(vec![6100.0, 9760.0, 20000.0, 12200.0])).unwrap();
        sim.set_input("ocde10", year, Value::from(vec![1.0, 1.5, 2.5, 2.0])).unwrap();

        // Taxable income per unit: 5000, 5333, 6557, 5000.
        let cheques = sim.calculate_float("cheques_energie", year).unwrap();
        assert_eq!(cheques.as_slice(), &[144.0, 190.0, 152.0, 227.0]);

        // No cheque before 2018.
        let avant = Period::year(2017).unwrap();
        sim.set_input("revdecm", avant, Value::from(vec![6100.0; 4])).unwrap();
        assert_eq!(sim.calculate_float("cheques_energie", avant).unwrap().as_slice(), &[0.0; 4]);
    }

    #[test]
    fn test_precarite_energetique() {
        let year = Period::year(2015).unwrap();
        let mut sim = Simulation::new(tax_benefit_system().unwrap(), 4);
        sim.set_input("pondmen", year, Value::from(vec![1.0; 4])).unwrap();
        sim.set_input("rev_disponible", year, Value::from(vec![10000.0, 12000.0, 40000.0, 60000.0])).unwrap();
        sim.set_input("depenses_electricite", year, Value::from(vec![1500.0, 600.0, 5000.0, 100.0])).unwrap();

        assert_eq!(sim.calculate("niveau_vie_decile", year).unwrap(), Value::from(vec![3i64, 5, 8, 10]));
        // Above the 10% effort only in a low decile.
        assert_eq!(sim.calculate("precarite_energetique", year).unwrap(), Value::from(vec![true, false, false, false]));
    }
}
