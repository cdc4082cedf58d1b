extern crate assert_cli;

#[cfg(test)]
mod tests {
    use assert_cli::Assert;

    #[test]
    fn test_cluster_fastani_table() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
                "--output-cluster-definition",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .is("gA\tgA\n\
                gA\tgB\n\
                gA\tgC\n\
                gD\tgD\n\
                gE\tgE\n")
            .unwrap();
    }

    #[test]
    fn test_cluster_with_quality_table() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
                "--quality-table",
                "tests/data/quality_scores.csv",
                "--output-cluster-definition",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .is("gB\tgB\n\
                gB\tgA\n\
                gB\tgC\n\
                gD\tgD\n\
                gE\tgE\n")
            .unwrap();
    }

    #[test]
    fn test_lower_ani_merges_clusters() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
                "--ani",
                "80",
                "--output-representative-list",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .is("gA\n")
            .unwrap();
    }

    #[test]
    fn test_skani_table_with_stem_ids() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/skani_triangle.tsv",
                "--id-style",
                "stem",
                "--ani",
                "95",
                "--output-representative-list",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .is("gA\ngC\ngD\n")
            .unwrap();
    }

    #[test]
    fn test_custom_columns() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/custom_columns.csv",
                "--columns",
                "query,reference,identity",
                "--ani",
                "98",
                "--output-cluster-definition",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .is("x\tx\nx\ty\n")
            .unwrap();
    }

    #[test]
    fn test_comparem_matrix() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/comparem_aai_summary.tsv",
                "--output-matrix",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .is(",p1,p2,p3\n\
                p1,100,99.1,72.4\n\
                p2,99.1,100,0\n\
                p3,72.4,0,100\n")
            .unwrap();
    }

    #[test]
    fn test_low_score_pairs() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
                "--output-low-score-pairs",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .is("entity_a\tentity_b\tscore\n\
                gA\tgD\t80.1\n\
                gD\tgE\t97.5\n\
                gA\tgC\t99.2\n")
            .unwrap();
    }

    #[test]
    fn test_copy_representatives() {
        let genomes = tempfile::TempDir::new().unwrap();
        for id in &["gA", "gD", "gE"] {
            std::fs::write(genomes.path().join(format!("{}.fna", id)), ">c\nACGT\n").unwrap();
        }
        let td = tempfile::TempDir::new().unwrap();
        let out = td.path().join("reps");
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
                "--genome-directory",
                genomes.path().to_str().unwrap(),
                "--output-representative-fasta-directory-copy",
                out.to_str().unwrap(),
            ])
            .succeeds()
            .stdout()
            .is("")
            .unwrap();
        for id in &["gA", "gD", "gE"] {
            assert!(out.join(format!("{}.fna", id)).is_file());
        }
        assert!(!out.join("gB.fna").exists());
    }

    #[test]
    fn test_no_output_specified() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
            ])
            .fails()
            .stderr()
            .contains("at least one output must be specified")
            .unwrap();
    }

    #[test]
    fn test_schema_mismatch() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
                "--table-format",
                "skani",
                "--output-representative-list",
                "/dev/stdout",
            ])
            .fails()
            .stderr()
            .contains("No column for 'entity_a'")
            .unwrap();
    }

    #[test]
    fn test_invalid_score() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/bad_score.tsv",
                "--output-representative-list",
                "/dev/stdout",
            ])
            .fails()
            .stderr()
            .contains("Invalid input in tests/data/bad_score.tsv")
            .unwrap();
    }

    #[test]
    fn test_threshold_sweep_csv() {
        Assert::main_binary()
            .with_args(&[
                "threshold-sweep",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
                "--thresholds",
                "100,99",
                "--output-csv",
                "/dev/stdout",
                "-t",
                "2",
            ])
            .succeeds()
            .stdout()
            .is("threshold,num_groups,representatives,group_sizes\n\
                99.0,3,gA;gD;gE,3;1;1\n\
                100.0,4,gA;gC;gD;gE,2;1;1;1\n")
            .unwrap();
    }

    #[test]
    fn test_threshold_sweep_defaults() {
        Assert::main_binary()
            .with_args(&[
                "threshold-sweep",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
                "--output-text",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .contains("Threshold: 98.0%\n  - Groups: 3\n")
            .unwrap();
    }

    #[test]
    fn test_cluster_validate_ok() {
        Assert::main_binary()
            .with_args(&[
                "cluster-validate",
                "--cluster-file",
                "tests/data/cluster_definition.tsv",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
            ])
            .succeeds()
            .unwrap();
    }

    #[test]
    fn test_cluster_validate_fails() {
        Assert::main_binary()
            .with_args(&[
                "cluster-validate",
                "--cluster-file",
                "tests/data/cluster_definition.tsv",
                "--similarity-table",
                "tests/data/fastani_pairs.tsv",
                "--ani",
                "80",
            ])
            .fails()
            .stderr()
            .contains("Score between representatives gA and gD is not ok: 80.1")
            .unwrap();
    }

    #[test]
    fn test_quality_ids_not_matching_warns() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--similarity-table",
                "tests/data/skani_triangle.tsv",
                "--quality-table",
                "tests/data/quality_scores.csv",
                "--ani",
                "95",
                "--output-representative-list",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .is("data/genomes/gA.fna
                data/genomes/gC.fna
                data/genomes/gD.fna
")
            .stderr()
            .contains("None of the 5 clustered genomes has an entry in the quality table")
            .unwrap();
    }
}
