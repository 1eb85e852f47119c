//! Default irregular verb catalog.

use tracing::info;

use crate::repository::{NewVerbRecord, StorageError, VerbRepository};

/// `(infinitive, past simple, past participle, french)`
pub const DEFAULT_VERBS: [(&str, &str, &str, &str); 53] = [
    // List 1
    ("read", "read", "read", "lire"),
    ("go", "went", "gone", "aller"),
    ("come", "came", "come", "venir"),
    ("put", "put", "put", "mettre"),
    ("sit", "sat", "sat", "s'asseoir"),
    ("stand", "stood", "stood", "se lever"),
    ("write", "wrote", "written", "écrire"),
    ("be", "was / were", "been", "être"),
    ("have", "had", "had", "avoir"),
    ("do", "did", "done", "faire"),
    ("choose", "chose", "chosen", "choisir"),
    ("make", "made", "made", "faire, fabriquer"),
    ("lose", "lost", "lost", "perdre"),
    ("overcome", "overcame", "overcome", "surmonter, vaincre"),
    ("hear", "heard", "heard", "entendre"),
    ("see", "saw", "seen", "voir"),
    ("speak", "spoke", "spoken", "parler"),
    ("fight", "fought", "fought", "se battre"),
    ("give", "gave", "given", "donner"),
    ("blend", "blent", "blent", "mélanger"),
    ("shoot", "shot", "shot", "tirer"),
    ("know", "knew", "known", "savoir, connaître"),
    ("run", "ran", "run", "courir"),
    ("swim", "swam", "swum", "nager"),
    ("rise", "rose", "risen", "monter, s'élever"),
    ("fly", "flew", "flown", "voler (dans l'air)"),
    ("spend", "spent", "spent", "dépenser de l'argent, passer du temps"),
    ("sell", "sold", "sold", "vendre"),
    ("buy", "bought", "bought", "acheter"),
    ("become", "became", "become", "devenir"),
    ("dream", "dreamt", "dreamt", "rêver"),
    ("drive", "drove", "driven", "conduire"),
    ("ride", "rode", "ridden", "faire/aller à cheval, moto, vélo"),
    ("pay", "paid", "paid", "payer"),
    ("cost", "cost", "cost", "coûter"),
    // List 2
    ("keep", "kept", "kept", "garder"),
    ("hit", "hit", "hit", "frapper"),
    ("find", "found", "found", "trouver"),
    ("wear", "wore", "worn", "porter (un vêtement)"),
    ("tell", "told", "told", "dire (à quelqu'un)"),
    ("say", "said", "said", "dire (quelque chose)"),
    ("mean", "meant", "meant", "signifier, vouloir dire"),
    ("feel", "felt", "felt", "ressentir"),
    ("break", "broke", "broken", "casser"),
    ("bring", "brought", "brought", "apporter"),
    ("grow", "grew", "grown", "grandir"),
    ("awake", "awoke", "awoken", "se réveiller, se lever"),
    ("begin", "began", "begun", "commencer"),
    ("learn", "learnt", "learnt", "apprendre"),
    ("teach", "taught", "taught", "enseigner"),
    ("leave", "left", "left", "quitter, partir, laisser"),
    ("meet", "met", "met", "rencontrer"),
    ("leap", "leapt", "leapt", "bondir"),
];

#[must_use]
pub fn default_records() -> Vec<NewVerbRecord> {
    DEFAULT_VERBS
        .iter()
        .map(|(inf, past, participle, french)| {
            NewVerbRecord::new(inf, past, participle, french)
        })
        .collect()
}

/// Insert the default catalog when the repository holds no verbs yet.
///
/// Returns the number of verbs inserted (zero if the catalog was already populated).
///
/// # Errors
///
/// Returns `StorageError` if the catalog cannot be read or written.
pub async fn seed_default_catalog(verbs: &dyn VerbRepository) -> Result<usize, StorageError> {
    let existing = verbs.list_verbs().await?.len();
    if existing > 0 {
        info!(existing, "verb catalog already populated, skipping seed");
        return Ok(0);
    }
    let inserted = verbs.insert_verbs(&default_records()).await?.len();
    info!(inserted, "seeded default verb catalog");
    Ok(inserted)
}
