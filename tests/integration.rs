mod trino;
