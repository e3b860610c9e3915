//! French descriptions of the teleinfo field codes (ERDF/Enedis
//! documentation, historic mode).

/// Shown for keys that match no known code.
pub const UNKNOWN_LABEL: &str = "?";

/// Known codes, matched by suffix in this order.
pub const TELEINFO_LABELS: &[(&str, &str)] = &[
    ("ADCO", "Adresse du compteur"),
    ("OPTARIF", "Option tarifaire choisie"),
    ("ISOUSC", "Intensité souscrite"),
    // Option Base
    ("BASE", "Index option Base"),
    // Option Heures Creuses
    ("HCHC", "Heures Creuses"),
    ("HCHP", "Heures Pleines"),
    // Option EJP
    ("EJPHN", "Heures Normales"),
    ("EJPHPM", "Heures de Pointe Mobile"),
    // Option Tempo
    ("BBRHCJB", "Heures Creuses Jours Bleus"),
    ("BBRHPJB", "Heures Pleines Jours Bleus"),
    ("BBRHCJW", "Heures Creuses Jours Blancs"),
    ("BBRHPJW", "Heures Pleines Jours Blancs"),
    ("BBRHCJR", "Heures Creuses Jours Rouges"),
    ("BBRHPJR", "Heures Pleines Jours Rouges"),
    ("PEJP", "Préavis Début EJP (30 min)"),
    ("PTEC", "Période Tarifaire en cours"),
    ("DEMAIN", "Couleur du lendemain"),
    ("IINST", "Intensité Instantanée"),
    ("IINST1", "Intensité Instantanée phase 1"),
    ("IINST2", "Intensité Instantanée phase 2"),
    ("IINST3", "Intensité Instantanée phase 3"),
    ("ADPS", "Avertissement de Dépassement De Puissance Souscrite"),
    ("IMAX", "Intensité maximale appelée"),
    ("IMAX1", "Intensité maximale appelée phase 1"),
    ("IMAX2", "Intensité maximale appelée phase 2"),
    ("IMAX3", "Intensité maximale appelée phase 3"),
    ("PAPP", "Puissance apparente"),
    ("PPAP", "Puissance apparente (mal orthographiée)"),
    ("HHPHC", "Horaire Heures Pleines Heures Creuses"),
    ("MOTDETAT", "Mot d'état du compteur"),
    ("PPOT", "Présence des potentiels"),
];

/// Label of the first code `key` ends with, or [`UNKNOWN_LABEL`].
pub fn label_for(key: &str) -> &'static str {
    lookup(TELEINFO_LABELS, key)
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> &'static str {
    table
        .iter()
        .find(|(code, _)| key.ends_with(code))
        .map(|(_, label)| *label)
        .unwrap_or(UNKNOWN_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_key_resolves_by_suffix() {
        assert_eq!(label_for("T1_BASE"), "Index option Base");
        assert_eq!(label_for("T2_IINST1"), "Intensité Instantanée phase 1");
        assert_eq!(label_for("ADCO"), "Adresse du compteur");
    }

    #[test]
    fn unknown_key_gets_placeholder() {
        assert_eq!(label_for("T1_FOO"), UNKNOWN_LABEL);
        assert_eq!(label_for(""), "?");
        // Matching is case-sensitive.
        assert_eq!(label_for("t1_base"), "?");
    }

    #[test]
    fn first_code_in_table_order_wins() {
        // "INST" is a suffix of "IINST": whichever comes first answers.
        let short_first = [("INST", "short"), ("IINST", "long")];
        let long_first = [("IINST", "long"), ("INST", "short")];
        assert_eq!(lookup(&short_first, "T1_IINST"), "short");
        assert_eq!(lookup(&long_first, "T1_IINST"), "long");
        assert_eq!(lookup(&long_first, "T1_XINST"), "short");
    }

    #[test]
    fn table_codes_are_unique() {
        let mut codes: Vec<&str> = TELEINFO_LABELS.iter().map(|(c, _)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), TELEINFO_LABELS.len());
    }
}
