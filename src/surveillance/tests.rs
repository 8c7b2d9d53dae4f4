use crate::surveillance::*;
use chrono::NaiveDate;
use color_eyre::eyre::{Report, Result};
use std::str::FromStr;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn genome(id: &str, date: NaiveDate, lineage: &str) -> Genome {
    Genome {
        genome_id: id.to_string(),
        date,
        country: "Denmark".to_string(),
        species: "Human".to_string(),
        lineage: lineage.to_string(),
    }
}

fn mutation(id: &str, position: usize, gene: &str, aa_change: &str, mutation_type: MutationType) -> Mutation {
    Mutation {
        genome_id: id.to_string(),
        position,
        gene: gene.to_string(),
        aa_change: aa_change.to_string(),
        mutation_type,
    }
}

/// Genomes over three ISO weeks, with no samples in the second.
fn dataset() -> Dataset {
    use MutationType::*;
    let genomes = vec![
        genome("g1", date(2021, 1, 4), "B.1.1.7"),
        genome("g2", date(2021, 1, 5), "B.1.1.7"),
        genome("g3", date(2021, 1, 10), "B.1.177"),
        genome("g4", date(2021, 1, 19), "B.1.1.7"),
        genome("g5", date(2021, 1, 20), "B.1.351"),
    ];
    let mutations = vec![
        mutation("g1", 23063, "S", "N501Y", Nonsynonymous),
        mutation("g1", 3037, "ORF1ab", "F924F", Synonymous),
        mutation("g2", 23063, "S", "N501Y", Nonsynonymous),
        mutation("g4", 23063, "S", "N501Y", Nonsynonymous),
        mutation("g5", 23063, "S", "N501Y", Nonsynonymous),
        mutation("g5", 23012, "S", "E484K", Nonsynonymous),
        mutation("g5", 241, "", "", Synonymous),
    ];
    Dataset::new(genomes, mutations).unwrap()
}

// ----------------------------------------------------------------------------
// Dataset

#[test]
fn read_dataset_from_files() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let metadata = dir.path().join("metadata.tsv");
    let mutations = dir.path().join("mutations.csv");
    std::fs::write(
        &metadata,
        "genome_id\tdate\tcountry\tspecies\tlineage\n\
         hCoV-19/Denmark/1\t2020-11-02\tDenmark\tMink\tB.1.1.298\n\
         hCoV-19/Denmark/2\t2020-11-03\tDenmark\tHuman\tB.1.1.298\n",
    )?;
    std::fs::write(
        &mutations,
        "genome_id,position,gene,aa_change,mutation_type\n\
         hCoV-19/Denmark/1,22920,S,Y453F,missense_variant\n\
         hCoV-19/Denmark/1,28881,N,,synonymous_variant\n",
    )?;
    let dataset = Dataset::read(&metadata, &mutations)?;
    assert_eq!(dataset.genomes.len(), 2);
    assert_eq!(dataset.mutations[0].label(), "S:Y453F");
    assert_eq!(dataset.mutations[1].label(), "28881");
    assert_eq!(dataset.mutations[1].mutation_type, MutationType::Synonymous);
    Ok(())
}

#[test]
fn unknown_mutation_type_names_value() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let metadata = dir.path().join("metadata.tsv");
    let mutations = dir.path().join("mutations.tsv");
    std::fs::write(&metadata, "genome_id\tdate\tcountry\tspecies\tlineage\ng1\t2021-01-04\tDenmark\tHuman\tB.1\n")?;
    std::fs::write(&mutations, "genome_id\tposition\tgene\taa_change\tmutation_type\ng1\t1\tS\tX1Y\tframeshift\n")?;
    let error = Dataset::read(&metadata, &mutations).unwrap_err();
    assert!(format!("{error:?}").contains("frameshift"));
    assert!(MutationType::from_str("frameshift").is_err());
    Ok(())
}

#[test]
fn orphan_mutation_is_an_error() {
    let genomes = vec![genome("g1", date(2021, 1, 4), "B.1")];
    let mutations = vec![mutation("g9", 1, "S", "X1Y", MutationType::Synonymous)];
    let error = Dataset::new(genomes, mutations).unwrap_err();
    assert!(error.to_string().contains("g9"));
}

#[test]
fn duplicate_genome_is_an_error() {
    let genomes = vec![genome("g1", date(2021, 1, 4), "B.1"), genome("g1", date(2021, 1, 5), "B.1")];
    assert!(Dataset::new(genomes, Vec::new()).is_err());
}

#[test]
fn unknown_label_is_an_error() {
    let dataset = dataset();
    assert_eq!(dataset.require_carriers("S:N501Y").unwrap().len(), 4);
    assert!(dataset.require_carriers("S:D614G").is_err());
    assert!(aggregate(&dataset, TimeBin::Week, &Grouping::Mutation("S:D614G".to_string())).is_err());
}

// ----------------------------------------------------------------------------
// Summary

#[test]
fn summary_counts() {
    let summary = Summary::from_dataset(&dataset());
    assert_eq!(summary.genomes, 5);
    assert_eq!(summary.mutations, 7);
    assert_eq!(summary.genomes_without_mutations, 1);
    assert_eq!(summary.synonymous_sites, 2);
    assert_eq!(summary.nonsynonymous_sites, 2);
    assert_eq!(summary.first_date, Some(date(2021, 1, 4)));
    assert_eq!(summary.last_date, Some(date(2021, 1, 20)));
    assert_eq!(summary.lineages["B.1.1.7"], 3);
    assert!(summary.pretty_print().contains("genomes: 5"));
}

#[test]
fn genome_without_mutations_counts_zero() {
    let counts = mutations_per_genome(&dataset());
    assert_eq!(counts.len(), 5);
    let g3 = counts.iter().find(|c| c.genome_id == "g3").unwrap();
    assert_eq!((g3.mutations, g3.synonymous, g3.nonsynonymous), (0, 0, 0));
    let g5 = counts.iter().find(|c| c.genome_id == "g5").unwrap();
    assert_eq!((g5.mutations, g5.synonymous, g5.nonsynonymous), (3, 1, 2));
}

#[test]
fn top_mutations_order() {
    let top = top_mutations(&dataset(), 2);
    assert_eq!(top.len(), 2);
    assert_eq!((top[0].label.as_str(), top[0].genomes), ("S:N501Y", 4));
    assert!((top[0].frequency - 0.8).abs() < 1e-12);
    // ties (1 genome each) are ordered by position
    assert_eq!(top[1].label, "241");
}

// ----------------------------------------------------------------------------
// Aggregate

#[test]
fn single_week_lineage_counts() -> Result<(), Report> {
    let monday = date(2021, 3, 1);
    let lineages = [("B.1", 4), ("B.1.1.7", 3), ("Other", 3)];
    let genomes = lineages
        .iter()
        .flat_map(|(lineage, n)| (0..*n).map(move |i| (lineage, i)))
        .enumerate()
        .map(|(id, (lineage, i))| genome(&format!("g{id}"), monday + chrono::Duration::days(i), lineage))
        .collect();
    let dataset = Dataset::new(genomes, Vec::new())?;

    let counts = aggregate(&dataset, TimeBin::Week, &Grouping::Lineage { top: None })?;
    let rows = counts.rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows.iter().map(|r| r.count).collect::<Vec<_>>(), [4, 3, 3]);
    assert!(rows.iter().all(|r| r.bucket == monday && r.total == 10));
    Ok(())
}

#[test]
fn aggregation_is_rectangular() -> Result<(), Report> {
    let dataset = dataset();
    for bin in [TimeBin::Week, TimeBin::SevenDay] {
        let counts = aggregate(&dataset, bin, &Grouping::Lineage { top: None })?;
        assert_eq!(counts.rows().len(), counts.buckets.len() * counts.categories.len());
        assert!(counts.counts.iter().all(|row| row.len() == counts.categories.len()));
        assert_eq!(counts.totals.iter().sum::<usize>(), dataset.genomes.len());
    }
    Ok(())
}

#[test]
fn empty_week_is_zero_filled() -> Result<(), Report> {
    let counts = aggregate(&dataset(), TimeBin::Week, &Grouping::None)?;
    assert_eq!(counts.buckets, [date(2021, 1, 4), date(2021, 1, 11), date(2021, 1, 18)]);
    assert_eq!(counts.categories, [ALL]);
    assert_eq!(counts.totals, [3, 0, 2]);
    let empty = &counts.rows()[1];
    assert_eq!((empty.count, empty.frequency), (0, 0.0));
    Ok(())
}

#[test]
fn top_lineages_collapse_to_other() -> Result<(), Report> {
    let counts = aggregate(&dataset(), TimeBin::Week, &Grouping::Lineage { top: Some(1) })?;
    assert_eq!(counts.categories, ["B.1.1.7", OTHER]);
    assert_eq!(counts.get(date(2021, 1, 18), OTHER), Some(1));
    assert_eq!(counts.get(date(2021, 1, 4), "B.1.1.7"), Some(2));
    assert_eq!(counts.get(date(2021, 1, 4), "B.1.177"), None);
    Ok(())
}

#[test]
fn seven_day_bins_anchor_on_first_sample() -> Result<(), Report> {
    let counts = aggregate(&dataset(), TimeBin::SevenDay, &Grouping::None)?;
    // 2021-01-04 + 7k
    assert_eq!(counts.buckets, [date(2021, 1, 4), date(2021, 1, 11), date(2021, 1, 18)]);

    let genomes = vec![genome("a", date(2021, 1, 6), "B.1"), genome("b", date(2021, 1, 13), "B.1")];
    let counts = aggregate(&Dataset::new(genomes, Vec::new())?, TimeBin::SevenDay, &Grouping::None)?;
    assert_eq!(counts.buckets, [date(2021, 1, 6), date(2021, 1, 13)]);
    let counts_week = aggregate(&Dataset::new(vec![genome("a", date(2021, 1, 6), "B.1")], Vec::new())?, TimeBin::Week, &Grouping::None)?;
    assert_eq!(counts_week.buckets, [date(2021, 1, 4)]);
    Ok(())
}

#[test]
fn mutation_presence_per_week() -> Result<(), Report> {
    let counts = aggregate(&dataset(), TimeBin::Week, &Grouping::Mutation("S:N501Y".to_string()))?;
    assert_eq!(counts.categories, [ABSENT, PRESENT]);
    assert_eq!(counts.counts, [[1, 2], [0, 0], [0, 2]]);
    Ok(())
}

#[test]
fn mutation_frequency_per_week() -> Result<(), Report> {
    let labels = vec!["S:N501Y".to_string(), "S:E484K".to_string()];
    let frequency = mutation_frequency(&dataset(), TimeBin::Week, &labels)?;
    assert_eq!(frequency.categories, labels);
    assert_eq!(frequency.counts, [[2, 0], [0, 0], [1 + 1, 1]]);
    assert_eq!(frequency.frequencies()[2], [1.0, 0.5]);
    Ok(())
}

#[test]
fn empty_dataset_has_no_buckets() -> Result<(), Report> {
    let counts = aggregate(&Dataset::default(), TimeBin::Week, &Grouping::Lineage { top: Some(3) })?;
    assert!(counts.buckets.is_empty() && counts.rows().is_empty());
    Ok(())
}

// ----------------------------------------------------------------------------
// Report

#[test]
fn report_writes_outputs() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let dataset = dataset();
    let metadata = dir.path().join("metadata.tsv.zst");
    let mutations = dir.path().join("mutations.tsv");

    let mut buffer = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(&mut buffer);
        dataset.genomes.iter().try_for_each(|g| writer.serialize(g))?;
        writer.flush()?;
    }
    std::fs::write(&metadata, zstd::encode_all(buffer.as_slice(), 0)?)?;
    crate::utils::write_table(&dataset.mutations, &mutations)?;

    let args = MutationsArgs {
        metadata,
        mutations,
        output_dir: dir.path().join("report"),
        top_lineages: Some(2),
        mutation: vec!["S:E484K".to_string()],
        top_mutations: 3,
        ..Default::default()
    };
    report(&args)?;

    for file in [
        "summary.json",
        "mutations_per_genome.tsv",
        "top_mutations.tsv",
        "lineages.tsv",
        "lineages.png",
        "lineage_frequency.png",
        "mutation_frequency.tsv",
        "mutation_frequency.png",
        "presence_S_E484K.tsv",
        "presence_S_E484K.png",
    ] {
        assert!(args.output_dir.join(file).exists(), "missing {file}");
    }

    let per_genome = std::fs::read_to_string(args.output_dir.join("mutations_per_genome.tsv"))?;
    assert!(per_genome.lines().any(|l| l.starts_with("g3\t") && l.ends_with("\t0\t0\t0")));
    Ok(())
}
