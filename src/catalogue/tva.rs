use super::base::{sum_of, tax_from_expense_including_tax, yearly, TAUX_NORMAL_TVA};
use crate::compute::Value;
use crate::store::{Formula, VariableDefinition};

/// VAT at the standard rate included in the expense `expense`.
fn tva_sur(expense: &'static str) -> Formula {
    Formula::new(move |view, period, parameters| {
        let taux = parameters.number(TAUX_NORMAL_TVA)?;
        Ok(Value::from(tax_from_expense_including_tax(&view.float(expense, period)?, taux)))
    })
}

pub fn definitions() -> Vec<VariableDefinition> {
    vec![
        yearly("tva_carburants", "Montant de TVA acquitté sur les carburants").formula(tva_sur("depenses_carburants")),
        yearly("tva_combustibles_liquides", "Montant de TVA acquitté sur les combustibles liquides").formula(tva_sur("depenses_combustibles_liquides")),
        yearly("tva_gaz_ville", "Montant de TVA acquitté sur le gaz de ville").formula(tva_sur("depenses_gaz_ville")),
        yearly("tva_energie", "Montant de TVA acquitté sur les produits énergétiques")
            .formula(sum_of(&["tva_carburants", "tva_combustibles_liquides", "tva_gaz_ville"])),
    ]
}
