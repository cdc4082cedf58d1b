extern crate anicluster;
use anicluster::cluster_argument_parsing::*;
use anicluster::cluster_validation;
use anicluster::AniClusterError;

extern crate clap;
use clap::*;

#[macro_use]
extern crate log;

extern crate bird_tool_utils;
use bird_tool_utils::clap_utils::*;

static PROGRAM_NAME: &str = "anicluster";

fn main() {
    let app = build_cli();
    let matches = app.clone().get_matches();
    set_log_level(&matches, false, PROGRAM_NAME, crate_version!());

    let result = match matches.subcommand_name() {
        Some("cluster") => run_cluster_subcommand(&matches, PROGRAM_NAME, crate_version!()),
        Some("threshold-sweep") => {
            let m = matches.subcommand_matches("threshold-sweep").unwrap();
            set_log_level(m, true, PROGRAM_NAME, crate_version!());
            set_num_threads(m);
            run_threshold_sweep_subcommand(m)
        }
        Some("cluster-validate") => {
            let m = matches.subcommand_matches("cluster-validate").unwrap();
            set_log_level(m, true, PROGRAM_NAME, crate_version!());
            run_cluster_validate(m)
        }
        _ => panic!("Programming error"),
    };
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn set_num_threads(m: &ArgMatches) {
    let num_threads: usize = *m.get_one::<usize>("threads").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .expect("Programming error: rayon initialised multiple times");
}

fn run_cluster_validate(m: &ArgMatches) -> anicluster::Result<()> {
    let ani = parse_threshold(m, "ani")?;
    let cluster_file = m.get_one::<String>("cluster-file").unwrap();
    let clusters = cluster_validation::read_cluster_definition(cluster_file)?;
    let records = read_tables_from_matches(m)?;

    let problems = cluster_validation::validate_clusters(&clusters, &records, ani);
    for problem in &problems {
        error!("{}", problem);
    }
    if problems.is_empty() {
        info!("Validation of {} clusters succeeded", clusters.len());
        Ok(())
    } else {
        Err(AniClusterError::InvalidInput {
            path: cluster_file.clone(),
            line: 0,
            reason: format!("{} problem(s) found during validation", problems.len()),
        })
    }
}

fn build_cli() -> Command {
    let validate_subcommand = add_clap_verbosity_flags(
        Command::new("cluster-validate")
            .about("Verify clustering results against similarity tables")
            .arg(
                Arg::new("cluster-file")
                    .long("cluster-file")
                    .required(true)
                    .help("Output of 'cluster' subcommand"),
            )
            .arg(
                Arg::new("ani")
                    .long("ani")
                    .default_value(anicluster::DEFAULT_ANI)
                    .help("Similarity threshold to validate against"),
            ),
    );

    let mut app = add_clap_verbosity_flags(Command::new(PROGRAM_NAME))
        .version(crate_version!())
        .author(anicluster::AUTHOR)
        .about("Genome clusterer and representative picker working from precomputed similarity tables")
        .arg_required_else_help(true)
        .subcommand(add_table_arguments(validate_subcommand));

    app = add_cluster_subcommand(app);
    app = add_threshold_sweep_subcommand(app);
    app
}
