//! Parse raw HTTP requests and inspect the query and path parameters they carry.

use microroute_rs::{parse_request, CompiledPattern};

fn main() {
    let request_bytes =
        b"GET /person/smith/anna?lang=en&lang=de HTTP/1.1\r\nHost: example.com\r\nUser-Agent: ExampleBrowser/1.0\r\n\r\n";

    let mut request = match parse_request(request_bytes) {
        Ok(request) => request,
        Err(err) => {
            println!("Error parsing request: {err}");
            return;
        }
    };

    println!("Successfully parsed HTTP request:");
    println!("Method: {}", request.method);
    println!("Path: {}", request.path);
    println!("Query: {}", request.query);
    println!("Version: {}", request.version);
    println!("Headers:");
    for (name, value) in &request.headers {
        println!("  {name}: {value}");
    }

    // Match the path against a pattern and merge the captures into the query
    let pattern = match CompiledPattern::new("/person/:last/:first") {
        Ok(pattern) => pattern,
        Err(err) => {
            println!("Bad pattern: {err}");
            return;
        }
    };
    if let Some(captures) = pattern.captures(&request.path) {
        let captures: Vec<(String, String)> = captures
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        for (name, value) in captures {
            request.query_params.add(name, value);
        }
    }

    println!("\nParameters:");
    for (name, value) in request.query_params.iter() {
        println!("  {name} = {value}");
    }
    println!("All values of lang: {:?}", request.get_query_params("lang"));

    let invalid_request = b"INVALID /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
    match parse_request(invalid_request) {
        Ok(_) => println!("\nUnexpectedly parsed invalid request!"),
        Err(err) => println!("\nExpected error parsing invalid request: {err}"),
    }
}
