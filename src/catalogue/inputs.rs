use super::base::yearly;
use crate::periods::PeriodUnit;
use crate::store::{PeriodPolicy, Scalar, VariableDefinition};

/// A yearly household attribute that holds for every sub-period.
fn attribute(name: &str, label: &str) -> VariableDefinition {
    VariableDefinition::float(name, PeriodUnit::Year).label(label).policy(PeriodPolicy::Dispatch)
}

/// Survey columns read as they are.
pub fn definitions() -> Vec<VariableDefinition> {
    vec![
        attribute("pondmen", "Pondération du ménage"),
        attribute("ocde10", "Nombre d'unités de consommation du ménage (échelle OCDE)").default_value(Scalar::Float(1.0)),
        attribute("veh_diesel", "Nombre de véhicules diesel du ménage"),
        attribute("veh_essence", "Nombre de véhicules essence du ménage"),
        attribute("elas_price_1_1", "Élasticité prix des carburants"),
        attribute("elas_price_2_2", "Élasticité prix des énergies du logement"),
        yearly("rev_disponible", "Revenu disponible du ménage"),
        yearly("revdecm", "Revenu déclaré du ménage"),
        yearly("poste_carburants", "Dépenses en carburants"),
        yearly("poste_combustibles_liquides", "Dépenses en combustibles liquides"),
        yearly("poste_gaz_ville", "Dépenses en gaz de ville, factures jointes incluses"),
        yearly("depenses_electricite", "Dépenses en électricité"),
        yearly("depenses_combustibles_solides", "Dépenses en combustibles solides"),
        yearly("depenses_energie_thermique", "Dépenses en énergie thermique"),
        yearly("depenses_gaz_liquefie", "Dépenses en gaz liquéfié"),
        yearly("diesel_quantite", "Quantité de gazole consommée (hectolitres)"),
        yearly("tarifs_sociaux_gaz", "Réduction de facture au titre du tarif social du gaz"),
        yearly("tarifs_sociaux_electricite", "Réduction de facture au titre du tarif social de l'électricité"),
        yearly("depenses_cigarettes", "Dépenses en cigarettes"),
        yearly("depenses_tabac_a_rouler", "Dépenses en tabac à rouler"),
    ]
}
