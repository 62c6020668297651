//! End-to-end tests: raw classifier reports -> per-sample tables -> merged table.

use std::fs;
use std::path::Path;

use anyhow::Result;
use short_read_taxonomy::{
    extract_unclassified, merge_tables, standardize_bracken, standardize_metaphlan,
    standardize_xtree, StandardizeParams, TaxonomyMap, WorkflowDirs,
};
use tempfile::tempdir;

const METAPHLAN_HEADER: &str = "#mpa_vJan21_CHOCOPhlAnSGB_202103\n\
                                #metaphlan reads.fq --input_type fastq\n\
                                #25000 reads processed\n\
                                #SampleID\tMetaphlan_Analysis\n\
                                #clade_name\tNCBI_tax_id\trelative_abundance\tadditional_species\n";

fn write_metaphlan(path: &Path, genus_rows: &[(&str, &str, f64)]) -> Result<()> {
    let mut text = METAPHLAN_HEADER.to_string();
    text.push_str("UNCLASSIFIED\t-1\t5.0\t\n");
    for (genus, taxid, pct) in genus_rows {
        text.push_str(&format!(
            "k__Bacteria|p__Bacteroidetes|g__{}\t2|976|{}\t{}\t\n",
            genus, taxid, pct
        ));
    }
    fs::write(path, text)?;
    Ok(())
}

/// MetaPhlAn for two samples, then merge the genus tables.
#[test]
fn test_metaphlan_samples_merge_by_position() -> Result<()> {
    let tmp = tempdir()?;
    let dirs = WorkflowDirs::new(tmp.path(), "short-read-taxonomy");
    dirs.ensure()?;
    let out = dirs.metaphlan_dir();

    let s1 = out.join("s1.txt");
    let s2 = out.join("s2.txt");
    write_metaphlan(&s1, &[("Bacteroides", "816", 30.0), ("Alistipes", "239759", 0.5)])?;
    write_metaphlan(&s2, &[("Bacteroides", "816", 60.0)])?;

    let params = StandardizeParams {
        min_abund: 0.01,
        uthresh: 0.0,
    };
    standardize_metaphlan(&s1, "s1", &out, &params)?;
    standardize_metaphlan(&s2, "s2", &out, &params)?;

    let s1_genus = fs::read_to_string(out.join("s1_genus.csv"))?;
    assert_eq!(
        s1_genus,
        "classifier,clade,tax_id,s1\n\
         metaphlan,Alistipes,239759,0.0\n\
         metaphlan,Bacteroides,816,0.3\n"
    );

    let merged = dirs.final_reports_dir().join("metaphlan_genus.csv");
    merge_tables(&[out.join("s1_genus.csv"), out.join("s2_genus.csv")], &merged)?;
    assert_eq!(
        fs::read_to_string(&merged)?,
        "classifier,clade,tax_id,s1,s2\n\
         metaphlan,Bacteroides,816,0.0,0.6\n\
         0,0,0,0.3,0.0\n"
    );
    Ok(())
}

/// Running a standardizer twice over the same input gives identical bytes.
#[test]
fn test_standardizers_are_idempotent() -> Result<()> {
    let tmp = tempdir()?;
    let report = tmp.path().join("s1.txt");
    write_metaphlan(&report, &[("Prevotella", "838", 12.5), ("Bacteroides", "816", 7.25)])?;
    let params = StandardizeParams::default();

    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    fs::create_dir_all(&first)?;
    fs::create_dir_all(&second)?;
    let a = standardize_metaphlan(&report, "s1", &first, &params)?;
    let b = standardize_metaphlan(&report, "s1", &second, &params)?;

    for (x, y) in a.iter().zip(&b) {
        assert_eq!(fs::read(x)?, fs::read(y)?, "{} differs", x.display());
    }
    Ok(())
}

#[test]
fn test_bracken_and_xtree_share_schema() -> Result<()> {
    let tmp = tempdir()?;

    let bracken_dir = tmp.path().join("2_kraken2").join("s1");
    fs::create_dir_all(&bracken_dir)?;
    let bracken = bracken_dir.join("species.bracken");
    fs::write(
        &bracken,
        "name\ttaxonomy_id\ttaxonomy_lvl\tkraken_assigned_reads\tadded_reads\tnew_est_reads\tfraction_total_reads\n\
         Escherichia coli\t562\tS\t100\t5\t105\t0.75\n",
    )?;
    let bracken_out = standardize_bracken(&bracken, tmp.path(), &StandardizeParams::default())?;

    let taxonomy_path = tmp.path().join("taxonomy.tsv");
    fs::write(&taxonomy_path, "Escherichia coli|GCF_000005845|562\n")?;
    let taxonomy = TaxonomyMap::load(&taxonomy_path)?;
    let xtree = tmp.path().join("merged.tsv");
    fs::write(
        &xtree,
        "NA\tXs1\n\
         d__Bacteria;g__Escherichia;s__Escherichia_coli\t0.8\n",
    )?;
    standardize_xtree(&xtree, &taxonomy, tmp.path(), &StandardizeParams::default())?;

    assert_eq!(
        fs::read_to_string(bracken_out)?,
        "classifier,clade,tax_id,s1\nkraken_bracken,Escherichia coli,562,0.75\n"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("xtree_species.csv"))?,
        "classifier,clade,tax_id,s1\nxtree,Escherichia coli,562,0.8\n"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("xtree_genus.csv"))?,
        "classifier,clade,tax_id,s1\nxtree,Escherichia,NaN,0.8\n"
    );
    Ok(())
}

#[test]
fn test_unclassified_extraction_from_file() -> Result<()> {
    let tmp = tempdir()?;
    let report = tmp.path().join("s1.kraken");
    fs::write(&report, "U\tread1\t0\nC\tread2\t562\nU\tread3\t0\n")?;
    let output = tmp.path().join("s1.unclassified.txt");

    assert_eq!(extract_unclassified(&report, &output)?, 2);
    assert_eq!(fs::read_to_string(output)?, "read1\nread3\n");
    Ok(())
}
