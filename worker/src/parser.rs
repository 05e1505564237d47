use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

pub fn parse_command_line<'a>() -> ArgMatches<'a> {
    build_app().get_matches()
}

pub fn build_app<'a, 'b>() -> App<'a, 'b> {
    let app = App::new("worker")
        .version(crate_version!())
        .author("Wordcount Authors <wordcount@cpssd.net>")
        .about("Runs a single word count map or reduce task")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("nfs")
                .long("nfs")
                .help("Directory of the shared filesystem used to store objects")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .help("JSON file with the word count configuration")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("arg")
                .long("arg")
                .help("Configuration override in the form key=value")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .required(false),
        )
        .arg(
            Arg::with_name("partitions")
                .long("partitions")
                .short("p")
                .help("Number of partitions produced by map")
                .takes_value(true)
                .required(false),
        )
        .subcommand(
            SubCommand::with_name("map")
                .about("Tokenizes one input document into partitioned intermediate objects")
                .arg(
                    Arg::with_name("task-id")
                        .long("task-id")
                        .help("Identifier of the map task, used to name its outputs")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("input")
                        .long("input")
                        .short("i")
                        .help("Locator of the input document")
                        .takes_value(true)
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("reduce")
                .about("Counts the words of one partition")
                .arg(
                    Arg::with_name("partition")
                        .long("partition")
                        .help("Partition index reduced by this task")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("input")
                        .long("input")
                        .short("i")
                        .help("Locator of an intermediate object of this partition")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .required(false),
                ),
        );

    with_s3_args(app)
}

#[cfg(feature = "s3")]
fn with_s3_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("s3-bucket")
            .long("s3-bucket")
            .help("S3 bucket used to store objects")
            .takes_value(true)
            .conflicts_with("nfs")
            .required(false),
    ).arg(
        Arg::with_name("s3-region")
            .long("s3-region")
            .help("Region of the S3 bucket, defaults to the AWS environment")
            .takes_value(true)
            .requires("s3-bucket")
            .required(false),
    )
}

#[cfg(not(feature = "s3"))]
fn with_s3_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app
}
